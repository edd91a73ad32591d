//! Databases: the first level below the account.

use async_trait::async_trait;
use std::fmt;
use tracing::debug;

use crate::{
    account::{Account, missing_child_id},
    backend::StoreBackend,
    capability::{Addable, Clearable, Createable, Deleteable, Ensure, Queryable, QueryableWrapped, Readable, Resource},
    collection::Collection,
    error::{StoreError, StoreResult},
    item::{CollectionInfo, DatabaseInfo, Item, ItemExt, RawItem, payload_id},
    link::{Link, ResourceKind, validate_id},
    listing::Listing,
    materialize::get_or_create,
};

/// Handle to a database, borrowed from its [`Account`].
pub struct Database<'a, B: StoreBackend> {
    account: &'a Account<B>,
    id: String,
    link: Link,
}

impl<'a, B: StoreBackend> Database<'a, B> {
    pub(crate) fn new(account: &'a Account<B>, id: String) -> Self {
        let link = account.link().join(ResourceKind::Database, &id);
        Self { account, id, link }
    }

    /// The owning account.
    pub fn account(&self) -> &'a Account<B> {
        self.account
    }

    pub(crate) fn backend(&self) -> &'a B {
        self.account.backend()
    }

    /// A detached handle to the collection `id` holding items of type `T`.
    pub fn collection<T: Item>(&self, id: impl Into<String>) -> Collection<'_, B, T> {
        Collection::new(self, id.into())
    }

    fn bind(&self, id: String) -> Self {
        Self::new(self.account, id)
    }

    /// Rejects handles whose id cannot appear in a link.
    pub(crate) fn check_path(&self) -> StoreResult<()> {
        validate_id(&self.id)
    }

    /// Binds an empty payload id to this handle's id and rejects ids that cannot name a database.
    fn prepare(&self, mut item: DatabaseInfo) -> StoreResult<DatabaseInfo> {
        if item.id.is_empty() {
            item.id = self.id.clone();
        }

        validate_id(&item.id)?;
        Ok(item)
    }
}

impl<'a, B: StoreBackend> Clone for Database<'a, B> {
    fn clone(&self) -> Self {
        Self {
            account: self.account,
            id: self.id.clone(),
            link: self.link.clone(),
        }
    }
}

impl<'a, B: StoreBackend> fmt::Debug for Database<'a, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("link", &self.link)
            .finish()
    }
}

impl<'a, B: StoreBackend> Resource for Database<'a, B> {
    fn id(&self) -> &str {
        &self.id
    }

    fn link(&self) -> &Link {
        &self.link
    }
}

#[async_trait]
impl<'a, B: StoreBackend> Createable for Database<'a, B> {
    type Underlying = DatabaseInfo;

    async fn create(&self, item: DatabaseInfo) -> StoreResult<Self> {
        let item = self.prepare(item)?;
        let created = self
            .backend()
            .create_item(self.account.link(), item.to_payload()?)
            .await?;

        debug!(target: "docnest::tree", link = %created.link, "database created");

        Ok(self.bind(created.id))
    }

    async fn create_many(&self, items: Vec<DatabaseInfo>) -> StoreResult<Vec<Self>> {
        let payloads = items
            .into_iter()
            .map(|item| {
                validate_id(&item.id)?;
                item.to_payload()
            })
            .collect::<StoreResult<Vec<_>>>()?;

        let created = self
            .backend()
            .create_items(self.account.link(), payloads)
            .await?;

        Ok(created
            .into_iter()
            .map(|created| self.bind(created.id))
            .collect())
    }
}

#[async_trait]
impl<'a, B: StoreBackend> Readable for Database<'a, B> {
    type Underlying = DatabaseInfo;

    async fn read(&self) -> StoreResult<DatabaseInfo> {
        self.check_path()?;
        DatabaseInfo::from_payload(self.backend().read_item(&self.link).await?)
    }
}

#[async_trait]
impl<'a, B: StoreBackend> Ensure for Database<'a, B> {
    async fn ensure_with(&self, default: DatabaseInfo) -> StoreResult<Self> {
        self.check_path()?;

        let default = self.prepare(default)?;
        if default.id != self.id {
            return Err(StoreError::Validation(format!(
                "default payload id {:?} does not match {}",
                default.id, self.link
            )));
        }

        get_or_create(self.backend(), &self.link, default.to_payload()?).await?;
        Ok(self.clone())
    }
}

#[async_trait]
impl<'a, B: StoreBackend> Deleteable for Database<'a, B> {
    async fn delete(&self) -> StoreResult<()> {
        self.check_path()?;
        self.backend().delete_item(&self.link).await?;
        debug!(target: "docnest::tree", link = %self.link, "database deleted");
        Ok(())
    }
}

#[async_trait]
impl<'a, B: StoreBackend> Addable for Database<'a, B> {
    type Child = CollectionInfo;

    async fn add(&self, item: CollectionInfo) -> StoreResult<&Self> {
        validate_id(&item.id)?;

        let created = self
            .backend()
            .create_item(&self.link, item.to_payload()?)
            .await?;

        debug!(target: "docnest::tree", link = %created.link, "collection added");

        Ok(self)
    }

    async fn add_many(&self, items: Vec<CollectionInfo>) -> StoreResult<&Self> {
        let payloads = items
            .iter()
            .map(|item| {
                validate_id(&item.id)?;
                item.to_payload()
            })
            .collect::<StoreResult<Vec<_>>>()?;

        self.backend()
            .create_items(&self.link, payloads)
            .await?;

        Ok(self)
    }
}

#[async_trait]
impl<'a, B: StoreBackend> Clearable for Database<'a, B> {
    async fn clear(&self) -> StoreResult<&Self> {
        self.backend().clear_children(&self.link).await?;
        debug!(target: "docnest::tree", link = %self.link, "database cleared");
        Ok(self)
    }
}

impl<'a, B: StoreBackend> Queryable for Database<'a, B> {
    type Child = CollectionInfo;

    fn query(&self) -> Listing<'_, CollectionInfo> {
        Listing::new(self.backend(), self.link.clone(), CollectionInfo::from_payload)
    }
}

impl<'a, B: StoreBackend> QueryableWrapped for Database<'a, B> {
    /// Collections reached by listing carry no item type; cast them to recover one.
    type Wrapped<'w>
        = Collection<'w, B, RawItem>
    where
        Self: 'w;

    fn query_wrapped(&self) -> Listing<'_, Collection<'_, B, RawItem>> {
        Listing::new(self.backend(), self.link.clone(), move |payload| {
            let id = payload_id(&payload).ok_or_else(|| missing_child_id(ResourceKind::Collection))?;
            Ok(self.collection::<RawItem>(id))
        })
    }
}
