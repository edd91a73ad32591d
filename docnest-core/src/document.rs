//! Documents: the leaves of the resource tree.

use async_trait::async_trait;
use std::{any::type_name, fmt, marker::PhantomData};
use tracing::debug;

use crate::{
    backend::StoreBackend,
    capability::{Createable, Deleteable, Ensure, Readable, Resource, Updateable},
    cast::check_refinement,
    collection::Collection,
    error::{StoreError, StoreResult},
    item::{Item, ItemExt},
    link::{Link, ResourceKind, validate_id},
    materialize::get_or_create,
};

/// Handle to a document decoded as `T`, inside a collection of `S` items.
///
/// `T` and `S` differ only after a [`Document::cast`].
pub struct Document<'a, B: StoreBackend, T: Item, S: Item = T> {
    collection: &'a Collection<'a, B, S>,
    id: String,
    link: Link,
    _item: PhantomData<fn() -> T>,
}

impl<'a, B: StoreBackend, T: Item, S: Item> Document<'a, B, T, S> {
    pub(crate) fn new(collection: &'a Collection<'a, B, S>, id: String) -> Self {
        let link = collection.link().join(ResourceKind::Document, &id);

        Self {
            collection,
            id,
            link,
            _item: PhantomData,
        }
    }

    /// The owning collection.
    pub fn collection(&self) -> &'a Collection<'a, B, S> {
        self.collection
    }

    fn backend(&self) -> &'a B {
        self.collection.backend()
    }

    /// Re-types this handle to decode its payload as `U`.
    ///
    /// The link and id are unchanged and no I/O is performed; a later read fails if the stored
    /// payload does not decode as `U`.
    ///
    /// # Errors
    ///
    /// Fails with [`StoreError::CastIncompatible`] if `U` is not a refinement of `T`.
    pub fn cast<U: Item>(&self) -> StoreResult<Document<'a, B, U, S>> {
        check_refinement::<T, U>()?;

        Ok(Document {
            collection: self.collection,
            id: self.id.clone(),
            link: self.link.clone(),
            _item: PhantomData,
        })
    }

    fn bind(&self, id: String) -> Self {
        Self::new(self.collection, id)
    }

    fn check_path(&self) -> StoreResult<()> {
        self.collection.check_path()?;
        validate_id(&self.id)
    }

    /// Fills an empty payload id with this handle's id and rejects any other id.
    fn claim(&self, mut item: T) -> StoreResult<T> {
        if item.id().is_empty() {
            item.set_id(self.id.clone());
        }

        if item.id() != self.id {
            return Err(StoreError::Validation(format!(
                "payload id {:?} does not match {}",
                item.id(),
                self.link
            )));
        }

        Ok(item)
    }
}

impl<'a, B: StoreBackend, T: Item, S: Item> Clone for Document<'a, B, T, S> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection,
            id: self.id.clone(),
            link: self.link.clone(),
            _item: PhantomData,
        }
    }
}

impl<'a, B: StoreBackend, T: Item, S: Item> fmt::Debug for Document<'a, B, T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("link", &self.link)
            .field("item", &type_name::<T>())
            .finish()
    }
}

impl<'a, B: StoreBackend, T: Item, S: Item> Resource for Document<'a, B, T, S> {
    fn id(&self) -> &str {
        &self.id
    }

    fn link(&self) -> &Link {
        &self.link
    }
}

#[async_trait]
impl<'a, B: StoreBackend, T: Item, S: Item> Createable for Document<'a, B, T, S> {
    type Underlying = T;

    /// Creates the document. With both the handle id and the payload id empty, the store
    /// assigns one and the returned handle is bound to it.
    async fn create(&self, mut item: T) -> StoreResult<Self> {
        if item.id().is_empty() {
            item.set_id(self.id.clone());
        }

        let created = self
            .backend()
            .create_item(self.collection.link(), item.to_payload()?)
            .await?;

        debug!(target: "docnest::tree", link = %created.link, "document created");

        Ok(self.bind(created.id))
    }

    async fn create_many(&self, items: Vec<T>) -> StoreResult<Vec<Self>> {
        let payloads = items
            .iter()
            .map(ItemExt::to_payload)
            .collect::<StoreResult<Vec<_>>>()?;

        let created = self
            .backend()
            .create_items(self.collection.link(), payloads)
            .await?;

        Ok(created
            .into_iter()
            .map(|created| self.bind(created.id))
            .collect())
    }
}

#[async_trait]
impl<'a, B: StoreBackend, T: Item, S: Item> Readable for Document<'a, B, T, S> {
    type Underlying = T;

    async fn read(&self) -> StoreResult<T> {
        self.check_path()?;
        T::from_payload(self.backend().read_item(&self.link).await?)
    }
}

#[async_trait]
impl<'a, B: StoreBackend, T: Item, S: Item> Updateable for Document<'a, B, T, S> {
    async fn update(&self, item: T) -> StoreResult<Self> {
        self.check_path()?;

        let item = self.claim(item)?;

        self.backend()
            .update_item(&self.link, item.to_payload()?)
            .await?;

        debug!(target: "docnest::tree", link = %self.link, "document updated");

        Ok(self.clone())
    }
}

#[async_trait]
impl<'a, B: StoreBackend, T: Item, S: Item> Ensure for Document<'a, B, T, S> {
    async fn ensure_with(&self, default: T) -> StoreResult<Self> {
        self.check_path()?;

        let default = self.claim(default)?;
        get_or_create(self.backend(), &self.link, default.to_payload()?).await?;

        Ok(self.clone())
    }
}

#[async_trait]
impl<'a, B: StoreBackend, T: Item, S: Item> Deleteable for Document<'a, B, T, S> {
    async fn delete(&self) -> StoreResult<()> {
        self.check_path()?;
        self.backend().delete_item(&self.link).await?;
        debug!(target: "docnest::tree", link = %self.link, "document deleted");
        Ok(())
    }
}
