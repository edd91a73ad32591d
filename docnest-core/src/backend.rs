//! The store collaborator contract consumed by the resource tree.
//!
//! A [`StoreBackend`] addresses everything by [`Link`] and moves payloads as [`Bson`]
//! documents. The hierarchy wrappers never talk to a store any other way.
//!
//! # Store rules
//!
//! Implementations are expected to follow these rules, which the wrappers rely on:
//!
//! - A payload's identifier lives under the `"id"` key. A document created with an empty or
//!   missing id gets a server-assigned one. Databases and collections require an id.
//! - Creating under a parent that does not exist fails with
//!   [`StoreError::NotFound`](crate::error::StoreError::NotFound) for the parent link.
//! - Creating an identifier that already exists fails with
//!   [`StoreError::Conflict`](crate::error::StoreError::Conflict).
//! - Deleting a resource removes its subtree. Deleting an absent resource fails with `NotFound`.
//! - Children are listed in creation order.
//!
//! # Example
//!
//! ```ignore
//! use docnest::{backend::StoreBackend, link::Link};
//! use bson::{Bson, doc};
//!
//! let orders = backend.create_item(&Link::root(), Bson::Document(doc! { "id": "orders" })).await?;
//! assert_eq!(orders.link.as_str(), "/dbs/orders");
//! ```

use async_trait::async_trait;
use bson::Bson;
use std::{fmt::Debug, sync::Arc};

use crate::{
    error::StoreResult,
    item::payload_id,
    link::Link,
    query::Query,
};

/// Identity of a freshly created resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub id: String,
    pub link: Link,
}

/// Abstract interface for the backing document store.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` and tolerate concurrent calls. Conflicting writes
/// are resolved by the store's own concurrency control; the tree adds no client-side locking.
///
/// # Errors
///
/// Network and backend failures surface as
/// [`StoreError::Transient`](crate::error::StoreError::Transient). No method retries.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Persists `payload` as a new child of `parent`.
    ///
    /// Returns the identifier (client supplied or server assigned) and link of the new resource.
    async fn create_item(&self, parent: &Link, payload: Bson) -> StoreResult<Created>;

    /// Persists several children of `parent`, preserving input order in the result.
    ///
    /// Batches are ordered and fail fast: the first failing item aborts the batch and items
    /// before it stay created. Backends may tighten this to all-or-nothing.
    async fn create_items(&self, parent: &Link, payloads: Vec<Bson>) -> StoreResult<Vec<Created>> {
        let mut created = Vec::with_capacity(payloads.len());

        for payload in payloads {
            created.push(self.create_item(parent, payload).await?);
        }

        Ok(created)
    }

    /// Fetches the current payload at `link`.
    async fn read_item(&self, link: &Link) -> StoreResult<Bson>;

    /// Replaces the payload at `link` wholesale and returns the stored payload.
    async fn update_item(&self, link: &Link, payload: Bson) -> StoreResult<Bson>;

    /// Removes the resource at `link` together with its subtree.
    async fn delete_item(&self, link: &Link) -> StoreResult<()>;

    /// Lists the payloads of all children of `parent`, in creation order.
    async fn list_children(&self, parent: &Link) -> StoreResult<Vec<Bson>>;

    /// Lists the payloads of the children of `parent` selected by `query`.
    ///
    /// Predicate semantics are store defined.
    async fn query_children(&self, parent: &Link, query: Query) -> StoreResult<Vec<Bson>>;

    /// Removes every child of `parent`.
    ///
    /// The default implementation deletes the current children one by one; stores with a
    /// bulk operation should override it.
    async fn clear_children(&self, parent: &Link) -> StoreResult<()> {
        for payload in self.list_children(parent).await? {
            if let Some(id) = payload_id(&payload) {
                self.delete_item(&parent.child(id)?).await?;
            }
        }

        Ok(())
    }

    /// Releases connections and other resources held by the backend.
    async fn shutdown(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend + ?Sized,
{
    async fn create_item(&self, parent: &Link, payload: Bson) -> StoreResult<Created> {
        (**self).create_item(parent, payload).await
    }

    async fn create_items(&self, parent: &Link, payloads: Vec<Bson>) -> StoreResult<Vec<Created>> {
        (**self).create_items(parent, payloads).await
    }

    async fn read_item(&self, link: &Link) -> StoreResult<Bson> {
        (**self).read_item(link).await
    }

    async fn update_item(&self, link: &Link, payload: Bson) -> StoreResult<Bson> {
        (**self).update_item(link, payload).await
    }

    async fn delete_item(&self, link: &Link) -> StoreResult<()> {
        (**self).delete_item(link).await
    }

    async fn list_children(&self, parent: &Link) -> StoreResult<Vec<Bson>> {
        (**self).list_children(parent).await
    }

    async fn query_children(&self, parent: &Link, query: Query) -> StoreResult<Vec<Bson>> {
        (**self).query_children(parent, query).await
    }

    async fn clear_children(&self, parent: &Link) -> StoreResult<()> {
        (**self).clear_children(parent).await
    }

    async fn shutdown(&self) -> StoreResult<()> {
        (**self).shutdown().await
    }
}

#[async_trait]
impl<B> StoreBackend for Arc<B>
where
    B: StoreBackend + ?Sized,
{
    async fn create_item(&self, parent: &Link, payload: Bson) -> StoreResult<Created> {
        (**self).create_item(parent, payload).await
    }

    async fn create_items(&self, parent: &Link, payloads: Vec<Bson>) -> StoreResult<Vec<Created>> {
        (**self).create_items(parent, payloads).await
    }

    async fn read_item(&self, link: &Link) -> StoreResult<Bson> {
        (**self).read_item(link).await
    }

    async fn update_item(&self, link: &Link, payload: Bson) -> StoreResult<Bson> {
        (**self).update_item(link, payload).await
    }

    async fn delete_item(&self, link: &Link) -> StoreResult<()> {
        (**self).delete_item(link).await
    }

    async fn list_children(&self, parent: &Link) -> StoreResult<Vec<Bson>> {
        (**self).list_children(parent).await
    }

    async fn query_children(&self, parent: &Link, query: Query) -> StoreResult<Vec<Bson>> {
        (**self).query_children(parent, query).await
    }

    async fn clear_children(&self, parent: &Link) -> StoreResult<()> {
        (**self).clear_children(parent).await
    }

    async fn shutdown(&self) -> StoreResult<()> {
        (**self).shutdown().await
    }
}

/// Factory for backends, usually carrying connection configuration.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> StoreResult<Self::Backend>;
}
