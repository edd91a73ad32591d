//! Typed collections of documents.
//!
//! A [`Collection`] is bound to an item type `T` used to decode its documents. The type is a
//! local view only: the store keeps payloads as documents, and [`Collection::cast`] re-types a
//! handle without touching the store.
//!
//! # Example
//!
//! ```ignore
//! use docnest::prelude::*;
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize, Item)]
//! pub struct Widget {
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! let orders = account.database("orders").ensure().await?;
//! let items = orders.collection::<Widget>("items").ensure().await?;
//!
//! items.add(Widget { id: "a1".into(), name: "widget".into() }).await?;
//! let fresh = items.changes().await?;
//! ```

use async_trait::async_trait;
use std::{any::type_name, fmt, marker::PhantomData, sync::Arc};
use tracing::debug;

use crate::{
    account::missing_child_id,
    backend::StoreBackend,
    capability::{
        Addable, Clearable, Createable, Deleteable, Ensure, Queryable, QueryableWrapped, Readable, Resource, Trackable,
        Updateable,
    },
    cast::check_refinement,
    changes::ChangeCursor,
    database::Database,
    document::Document,
    error::{StoreError, StoreResult},
    item::{CollectionInfo, Item, ItemExt, payload_id},
    link::{Link, ResourceKind, validate_id},
    listing::Listing,
    materialize::get_or_create,
};

/// Handle to a collection of `T` items, borrowed from its [`Database`].
///
/// Clones and casts of a handle share its change cursor. A handle obtained anew from
/// [`Database::collection`] starts with an empty cursor.
pub struct Collection<'a, B: StoreBackend, T: Item> {
    database: &'a Database<'a, B>,
    id: String,
    link: Link,
    cursor: Arc<ChangeCursor>,
    _item: PhantomData<fn() -> T>,
}

impl<'a, B: StoreBackend, T: Item> Collection<'a, B, T> {
    pub(crate) fn new(database: &'a Database<'a, B>, id: String) -> Self {
        let link = database.link().join(ResourceKind::Collection, &id);

        Self {
            database,
            id,
            link,
            cursor: Arc::new(ChangeCursor::new()),
            _item: PhantomData,
        }
    }

    /// The owning database.
    pub fn database(&self) -> &'a Database<'a, B> {
        self.database
    }

    pub(crate) fn backend(&self) -> &'a B {
        self.database.backend()
    }

    /// A detached handle to the document `id`. No I/O is performed.
    ///
    /// An empty id yields a handle whose [`Createable::create`] lets the store assign one.
    pub fn document(&self, id: impl Into<String>) -> Document<'_, B, T> {
        Document::new(self, id.into())
    }

    /// The tag recorded as [`CollectionInfo::schema`] when this handle creates its collection.
    pub fn schema_tag() -> &'static str {
        type_name::<T>()
    }

    /// The change cursor behind [`Trackable::changes`].
    pub fn cursor(&self) -> &ChangeCursor {
        &self.cursor
    }

    /// Re-types this handle to decode items as `U`.
    ///
    /// The returned handle has the same link and id and shares the change cursor. No I/O is
    /// performed, and stored payloads are not checked.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::CastIncompatible`] if `U` is not a refinement of `T`.
    pub fn cast<U: Item>(&self) -> StoreResult<Collection<'a, B, U>> {
        check_refinement::<T, U>()?;

        Ok(Collection {
            database: self.database,
            id: self.id.clone(),
            link: self.link.clone(),
            cursor: self.cursor.clone(),
            _item: PhantomData,
        })
    }

    fn bind(&self, id: String) -> Self {
        Self::new(self.database, id)
    }

    /// Binds an empty payload id to this handle's id, tags the schema and validates the id.
    fn prepare(&self, mut info: CollectionInfo) -> StoreResult<CollectionInfo> {
        if info.id.is_empty() {
            info.id = self.id.clone();
        }

        if info.schema.is_none() {
            info.schema = Some(Self::schema_tag().to_string());
        }

        validate_id(&info.id)?;
        Ok(info)
    }

    /// Rejects handles whose id, or an ancestor's, cannot appear in a link.
    pub(crate) fn check_path(&self) -> StoreResult<()> {
        self.database.check_path()?;
        validate_id(&self.id)
    }

    fn check_own_id(&self, info: &CollectionInfo) -> StoreResult<()> {
        if info.id != self.id {
            return Err(StoreError::Validation(format!(
                "payload id {:?} does not match {}",
                info.id, self.link
            )));
        }

        Ok(())
    }
}

impl<'a, B: StoreBackend, T: Item> Clone for Collection<'a, B, T> {
    fn clone(&self) -> Self {
        Self {
            database: self.database,
            id: self.id.clone(),
            link: self.link.clone(),
            cursor: self.cursor.clone(),
            _item: PhantomData,
        }
    }
}

impl<'a, B: StoreBackend, T: Item> fmt::Debug for Collection<'a, B, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("link", &self.link)
            .field("item", &type_name::<T>())
            .finish()
    }
}

impl<'a, B: StoreBackend, T: Item> Resource for Collection<'a, B, T> {
    fn id(&self) -> &str {
        &self.id
    }

    fn link(&self) -> &Link {
        &self.link
    }
}

#[async_trait]
impl<'a, B: StoreBackend, T: Item> Createable for Collection<'a, B, T> {
    type Underlying = CollectionInfo;

    async fn create(&self, info: CollectionInfo) -> StoreResult<Self> {
        let info = self.prepare(info)?;
        let created = self
            .backend()
            .create_item(self.database.link(), info.to_payload()?)
            .await?;

        debug!(target: "docnest::tree", link = %created.link, "collection created");

        Ok(self.bind(created.id))
    }

    async fn create_many(&self, infos: Vec<CollectionInfo>) -> StoreResult<Vec<Self>> {
        let payloads = infos
            .into_iter()
            .map(|mut info| {
                validate_id(&info.id)?;
                info.schema.get_or_insert_with(|| Self::schema_tag().to_string());
                info.to_payload()
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let created = self
            .backend()
            .create_items(self.database.link(), payloads)
            .await?;

        Ok(created
            .into_iter()
            .map(|created| self.bind(created.id))
            .collect())
    }
}

#[async_trait]
impl<'a, B: StoreBackend, T: Item> Readable for Collection<'a, B, T> {
    type Underlying = CollectionInfo;

    async fn read(&self) -> StoreResult<CollectionInfo> {
        self.check_path()?;
        CollectionInfo::from_payload(self.backend().read_item(&self.link).await?)
    }
}

#[async_trait]
impl<'a, B: StoreBackend, T: Item> Updateable for Collection<'a, B, T> {
    async fn update(&self, info: CollectionInfo) -> StoreResult<Self> {
        self.check_path()?;

        let mut info = info;
        if info.id.is_empty() {
            info.id = self.id.clone();
        }
        self.check_own_id(&info)?;

        self.backend()
            .update_item(&self.link, info.to_payload()?)
            .await?;

        Ok(self.clone())
    }
}

#[async_trait]
impl<'a, B: StoreBackend, T: Item> Ensure for Collection<'a, B, T> {
    async fn ensure_with(&self, default: CollectionInfo) -> StoreResult<Self> {
        self.check_path()?;

        let default = self.prepare(default)?;
        self.check_own_id(&default)?;

        get_or_create(self.backend(), &self.link, default.to_payload()?).await?;
        Ok(self.clone())
    }
}

#[async_trait]
impl<'a, B: StoreBackend, T: Item> Deleteable for Collection<'a, B, T> {
    async fn delete(&self) -> StoreResult<()> {
        self.check_path()?;
        self.backend().delete_item(&self.link).await?;
        debug!(target: "docnest::tree", link = %self.link, "collection deleted");
        Ok(())
    }
}

#[async_trait]
impl<'a, B: StoreBackend, T: Item> Addable for Collection<'a, B, T> {
    type Child = T;

    async fn add(&self, item: T) -> StoreResult<&Self> {
        let created = self
            .backend()
            .create_item(&self.link, item.to_payload()?)
            .await?;

        debug!(target: "docnest::tree", link = %created.link, "document added");

        Ok(self)
    }

    async fn add_many(&self, items: Vec<T>) -> StoreResult<&Self> {
        let payloads = items
            .iter()
            .map(ItemExt::to_payload)
            .collect::<StoreResult<Vec<_>>>()?;

        let created = self
            .backend()
            .create_items(&self.link, payloads)
            .await?;

        debug!(target: "docnest::tree", link = %self.link, count = created.len(), "documents added");

        Ok(self)
    }
}

#[async_trait]
impl<'a, B: StoreBackend, T: Item> Clearable for Collection<'a, B, T> {
    async fn clear(&self) -> StoreResult<&Self> {
        self.backend().clear_children(&self.link).await?;
        debug!(target: "docnest::tree", link = %self.link, "collection cleared");
        Ok(self)
    }
}

impl<'a, B: StoreBackend, T: Item> Queryable for Collection<'a, B, T> {
    type Child = T;

    fn query(&self) -> Listing<'_, T> {
        Listing::new(self.backend(), self.link.clone(), T::from_payload)
    }
}

impl<'a, B: StoreBackend, T: Item> QueryableWrapped for Collection<'a, B, T> {
    type Wrapped<'w>
        = Document<'w, B, T>
    where
        Self: 'w;

    fn query_wrapped(&self) -> Listing<'_, Document<'_, B, T>> {
        Listing::new(self.backend(), self.link.clone(), move |payload| {
            let id = payload_id(&payload).ok_or_else(|| missing_child_id(ResourceKind::Document))?;
            Ok(self.document(id))
        })
    }
}

#[async_trait]
impl<'a, B: StoreBackend, T: Item> Trackable for Collection<'a, B, T> {
    type Tracked = T;

    async fn changes(&self) -> StoreResult<Vec<T>> {
        self.check_path()?;

        let backend = self.backend();
        let link = &self.link;

        self.cursor
            .advance(|| backend.list_children(link), T::from_payload)
            .await
    }
}
