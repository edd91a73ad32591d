//! Small capability contracts that the hierarchy wrappers compose.
//!
//! Each level of the tree implements the intersection of capabilities that fits its role:
//!
//! | Wrapper | Itself | Over its children |
//! |---|---|---|
//! | [`Account`](crate::account::Account) | `Readable`, `Ensure` | `Addable`, `Clearable`, `Queryable`, `QueryableWrapped` |
//! | [`Database`](crate::database::Database) | `Createable`, `Readable`, `Deleteable`, `Ensure` | `Addable`, `Clearable`, `Queryable`, `QueryableWrapped` |
//! | [`Collection`](crate::collection::Collection) | `Createable`, `Readable`, `Updateable`, `Editable`, `Deleteable`, `Ensure` | `Addable`, `Clearable`, `Queryable`, `QueryableWrapped`, `Trackable` |
//! | [`Document`](crate::document::Document) | `Createable`, `Readable`, `Updateable`, `Editable`, `Deleteable`, `Ensure` | |
//!
//! Every async operation has a `*_blocking` twin that drives the same future to completion on
//! the calling thread. Blocking forms must not be called from inside an async runtime worker.

use async_trait::async_trait;
use futures::executor::block_on;

use crate::{
    error::{StoreError, StoreResult},
    item::Item,
    link::Link,
    listing::Listing,
};

/// A node of the resource tree.
#[async_trait]
pub trait Resource: Send + Sync {
    /// The identifier this wrapper is bound to. Empty for the account.
    fn id(&self) -> &str;

    /// The canonical link, computed from the ancestor chain without I/O.
    fn link(&self) -> &Link;

    /// Async form of [`Resource::link`]. Never performs I/O.
    async fn link_async(&self) -> Link {
        self.link().clone()
    }

    /// Returns `true` if both wrappers address the same remote resource, whatever their item type.
    fn same_resource<R: Resource + ?Sized>(&self, other: &R) -> bool {
        self.link() == other.link()
    }
}

/// Fetches the current remote payload of a resource.
#[async_trait]
pub trait Readable: Resource {
    type Underlying: Item;

    /// Fails with `NotFound` if the link does not resolve.
    async fn read(&self) -> StoreResult<Self::Underlying>;

    fn read_blocking(&self) -> StoreResult<Self::Underlying> {
        block_on(self.read())
    }
}

/// Idempotent get-or-create.
#[async_trait]
pub trait Ensure: Readable + Sized {
    /// Reads the resource, creating it from `default` if it does not exist.
    ///
    /// A creation that loses a race against a concurrent creator is turned into a re-read.
    /// An existing resource is never modified.
    async fn ensure_with(&self, default: Self::Underlying) -> StoreResult<Self>;

    /// [`Ensure::ensure_with`] using a default payload bound to this wrapper's id.
    async fn ensure(&self) -> StoreResult<Self> {
        self.ensure_with(Self::Underlying::with_id(self.id())).await
    }

    fn ensure_blocking(&self) -> StoreResult<Self> {
        block_on(self.ensure())
    }
}

/// Persists new resources of this wrapper's kind under this wrapper's parent.
#[async_trait]
pub trait Createable: Resource + Sized {
    type Underlying: Item;

    /// Creates a resource from `item`. An empty payload id is replaced by this wrapper's id.
    ///
    /// Fails with `Validation` if an id is required but missing, `Conflict` if the id is taken.
    async fn create(&self, item: Self::Underlying) -> StoreResult<Self>;

    /// Creates siblings from `items`, returning wrappers in input order.
    async fn create_many(&self, items: Vec<Self::Underlying>) -> StoreResult<Vec<Self>>;

    fn create_blocking(&self, item: Self::Underlying) -> StoreResult<Self> {
        block_on(self.create(item))
    }

    fn create_many_blocking(&self, items: Vec<Self::Underlying>) -> StoreResult<Vec<Self>> {
        block_on(self.create_many(items))
    }
}

/// Replaces the remote payload wholesale.
#[async_trait]
pub trait Updateable: Readable + Sized {
    /// Fails with `NotFound` if the resource no longer exists.
    async fn update(&self, item: Self::Underlying) -> StoreResult<Self>;

    fn update_blocking(&self, item: Self::Underlying) -> StoreResult<Self> {
        block_on(self.update(item))
    }
}

/// Read, mutate in place, write back.
#[async_trait]
pub trait Editable: Updateable {
    /// Applies `mutator` to the current payload and writes the result back as one update.
    ///
    /// The mutator may not change the identifier.
    async fn edit<F>(&self, mutator: F) -> StoreResult<Self>
    where
        F: FnOnce(&mut Self::Underlying) + Send;

    fn edit_blocking<F>(&self, mutator: F) -> StoreResult<Self>
    where
        F: FnOnce(&mut Self::Underlying) + Send,
    {
        block_on(self.edit(mutator))
    }
}

#[async_trait]
impl<R: Updateable> Editable for R {
    async fn edit<F>(&self, mutator: F) -> StoreResult<Self>
    where
        F: FnOnce(&mut Self::Underlying) + Send,
    {
        let mut current = self.read().await?;
        mutator(&mut current);

        if current.id() != self.id() {
            return Err(StoreError::Validation(format!(
                "edit of {} changed its id to {:?}",
                self.link(),
                current.id()
            )));
        }

        self.update(current).await
    }
}

/// Removes a resource and its subtree.
///
/// Deleting a resource that does not exist fails with `NotFound`.
#[async_trait]
pub trait Deleteable: Resource {
    async fn delete(&self) -> StoreResult<()>;

    fn delete_blocking(&self) -> StoreResult<()> {
        block_on(self.delete())
    }
}

/// Adds children to a container, returning the container for chaining.
#[async_trait]
pub trait Addable: Resource {
    type Child: Item;

    async fn add(&self, item: Self::Child) -> StoreResult<&Self>;

    /// Ordered, fail-fast batch add.
    async fn add_many(&self, items: Vec<Self::Child>) -> StoreResult<&Self>;

    fn add_blocking(&self, item: Self::Child) -> StoreResult<&Self> {
        block_on(self.add(item))
    }

    fn add_many_blocking(&self, items: Vec<Self::Child>) -> StoreResult<&Self> {
        block_on(self.add_many(items))
    }
}

/// Removes every child of a container.
#[async_trait]
pub trait Clearable: Resource {
    async fn clear(&self) -> StoreResult<&Self>;

    fn clear_blocking(&self) -> StoreResult<&Self> {
        block_on(self.clear())
    }
}

/// Lazy sequence over the raw child payloads of a container.
pub trait Queryable: Resource {
    type Child: Item;

    fn query(&self) -> Listing<'_, Self::Child>;
}

/// Lazy sequence over wrapped child handles of a container.
pub trait QueryableWrapped: Resource {
    type Wrapped<'w>: Resource
    where
        Self: 'w;

    fn query_wrapped(&self) -> Listing<'_, Self::Wrapped<'_>>;
}

/// Incremental "new children" polling.
#[async_trait]
pub trait Trackable: Resource {
    type Tracked: Item;

    /// Returns the children whose ids this wrapper has not surfaced before, in store order.
    async fn changes(&self) -> StoreResult<Vec<Self::Tracked>>;

    fn changes_blocking(&self) -> StoreResult<Vec<Self::Tracked>> {
        block_on(self.changes())
    }
}
