//! The root of the resource tree.
//!
//! An [`Account`] owns the store backend. Every other wrapper borrows it, directly or through
//! its ancestors, so the account must outlive all handles navigated from it.
//!
//! # Example
//!
//! ```ignore
//! use docnest::prelude::*;
//!
//! let account = Account::connect(InMemoryStore::builder()).await?;
//! let orders = account.database("orders").ensure().await?;
//! assert_eq!(orders.link().as_str(), "/dbs/orders");
//! ```

use async_trait::async_trait;
use std::{fmt, sync::Arc};
use tracing::debug;

use crate::{
    backend::{StoreBackend, StoreBackendBuilder},
    capability::{Addable, Clearable, Ensure, Queryable, QueryableWrapped, Readable, Resource},
    database::Database,
    error::{StoreError, StoreResult},
    item::{AccountInfo, DatabaseInfo, ItemExt, payload_id},
    link::{Link, ResourceKind},
    listing::Listing,
};

/// Handle to the store account, owner of the backend connection.
pub struct Account<B: StoreBackend> {
    backend: B,
    link: Link,
}

impl<B: StoreBackend> Account<B> {
    /// Wraps an already built backend.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            link: Link::root(),
        }
    }

    /// Builds the backend from `builder` and wraps it.
    pub async fn connect<Builder>(builder: Builder) -> StoreResult<Self>
    where
        Builder: StoreBackendBuilder<Backend = B>,
    {
        Ok(Self::new(builder.build().await?))
    }

    /// Returns a reference to the underlying store backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// A detached handle to the database `id`. No I/O is performed.
    pub fn database(&self, id: impl Into<String>) -> Database<'_, B> {
        Database::new(self, id.into())
    }

    /// Releases the backend's connections.
    pub async fn shutdown(self) -> StoreResult<()> {
        self.backend.shutdown().await
    }

    /// Erases the backend type.
    pub fn into_dyn(self) -> Account<Arc<dyn StoreBackend>>
    where
        B: 'static,
    {
        Account {
            backend: Arc::new(self.backend),
            link: self.link,
        }
    }
}

impl<B: StoreBackend + Clone> Clone for Account<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            link: self.link.clone(),
        }
    }
}

impl<B: StoreBackend> fmt::Debug for Account<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("backend", &self.backend)
            .finish()
    }
}

impl<B: StoreBackend> Resource for Account<B> {
    /// The account is addressed by the empty link and has no identifier of its own.
    fn id(&self) -> &str {
        ""
    }

    fn link(&self) -> &Link {
        &self.link
    }
}

#[async_trait]
impl<B: StoreBackend> Readable for Account<B> {
    type Underlying = AccountInfo;

    async fn read(&self) -> StoreResult<AccountInfo> {
        AccountInfo::from_payload(self.backend.read_item(&self.link).await?)
    }
}

/// The account is never created by this crate: ensuring it only confirms it is reachable.
#[async_trait]
impl<B: StoreBackend + Clone> Ensure for Account<B> {
    async fn ensure_with(&self, _default: AccountInfo) -> StoreResult<Self> {
        self.read().await?;
        Ok(self.clone())
    }
}

#[async_trait]
impl<B: StoreBackend> Addable for Account<B> {
    type Child = DatabaseInfo;

    async fn add(&self, item: DatabaseInfo) -> StoreResult<&Self> {
        let created = self
            .backend
            .create_item(&self.link, database_payload(&item)?)
            .await?;

        debug!(target: "docnest::tree", link = %created.link, "database added");

        Ok(self)
    }

    async fn add_many(&self, items: Vec<DatabaseInfo>) -> StoreResult<&Self> {
        let payloads = items
            .iter()
            .map(database_payload)
            .collect::<StoreResult<Vec<_>>>()?;

        let created = self
            .backend
            .create_items(&self.link, payloads)
            .await?;

        debug!(target: "docnest::tree", count = created.len(), "databases added");

        Ok(self)
    }
}

#[async_trait]
impl<B: StoreBackend> Clearable for Account<B> {
    async fn clear(&self) -> StoreResult<&Self> {
        self.backend.clear_children(&self.link).await?;
        debug!(target: "docnest::tree", "account cleared");
        Ok(self)
    }
}

impl<B: StoreBackend> Queryable for Account<B> {
    type Child = DatabaseInfo;

    fn query(&self) -> Listing<'_, DatabaseInfo> {
        Listing::new(&self.backend, self.link.clone(), DatabaseInfo::from_payload)
    }
}

impl<B: StoreBackend> QueryableWrapped for Account<B> {
    type Wrapped<'w>
        = Database<'w, B>
    where
        Self: 'w;

    fn query_wrapped(&self) -> Listing<'_, Database<'_, B>> {
        Listing::new(&self.backend, self.link.clone(), move |payload| {
            let id = payload_id(&payload).ok_or_else(|| missing_child_id(ResourceKind::Database))?;
            Ok(self.database(id))
        })
    }
}

fn database_payload(item: &DatabaseInfo) -> StoreResult<bson::Bson> {
    crate::link::validate_id(&item.id)?;
    item.to_payload()
}

pub(crate) fn missing_child_id(kind: ResourceKind) -> StoreError {
    StoreError::Validation(format!("store returned a {kind} without an id"))
}
