//! Main docnest crate: a typed resource tree over a remote document store.
//!
//! This crate is the primary entry point for users of docnest. It re-exports the core types
//! from the sub-crates and provides access to the storage backends.
//!
//! # Features
//!
//! - **Typed resource tree** - Account → database → collection → document, addressed by links
//! - **Composable capabilities** - Each level implements the create/read/update/edit/delete and
//!   child operations that fit its role, in async and blocking forms
//! - **Idempotent ensure** - Get-or-create that tolerates concurrent creators
//! - **Change tracking** - Poll a collection for children that appeared since the last poll
//! - **Casting** - Re-type a handle without touching the store
//! - **Multiple backends** - In-memory, and MongoDB behind the `mongodb` feature
//!
//! # Quick Start
//!
//! ```ignore
//! use docnest::{prelude::*, memory::InMemoryStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize, Item)]
//! pub struct Widget {
//!     pub id: String,
//!     pub name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> StoreResult<()> {
//!     let account = Account::connect(InMemoryStore::builder()).await?;
//!
//!     let orders = account.database("orders").ensure().await?;
//!     let items = orders.collection::<Widget>("items").ensure().await?;
//!
//!     let a1 = items
//!         .document("a1")
//!         .create(Widget { id: "a1".into(), name: "widget".into() })
//!         .await?;
//!
//!     assert_eq!(a1.link().as_str(), "/dbs/orders/colls/items/docs/a1");
//!
//!     let widgets = items
//!         .query()
//!         .filter(Filter::starts_with("name", "wid"))
//!         .fetch()
//!         .await?;
//!
//!     println!("Queried widgets: {widgets:?}");
//!
//!     for widget in items.changes().await? {
//!         println!("new: {}", widget.name);
//!     }
//!
//!     account.shutdown().await
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! An [`Account`](account::Account) can erase its backend type with `into_dyn`, which allows
//! runtime selection of backends:
//!
//! ```ignore
//! use docnest::{prelude::*, memory::InMemoryStore};
//!
//! let account: Account<std::sync::Arc<dyn StoreBackend>> =
//!     Account::new(InMemoryStore::new()).into_dyn();
//!
//! account.database("orders").ensure().await?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as docnest;

pub mod prelude;

pub use docnest_core::{
    account, backend, capability, changes, collection, database, document, error, item, link, listing, query,
};

pub use docnest_macros::Item;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use docnest_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docnest_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
