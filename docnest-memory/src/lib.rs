//! In-memory store backend for docnest.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It keeps the whole resource tree behind an async-aware read-write lock and is intended for
//! development and tests.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using an async-aware RwLock
//! - **Full query support** - Evaluates predicates, sorting, offset and limit
//! - **System properties** - Stamps `_self` and `_ts` on every stored payload
//! - **Atomic batches** - A batch is validated in full before anything is written
//!
//! # Quick Start
//!
//! ```ignore
//! use docnest::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> StoreResult<()> {
//!     let account = Account::connect(InMemoryStore::builder()).await?;
//!     let orders = account.database("orders").ensure().await?;
//!
//!     assert_eq!(orders.link().as_str(), "/dbs/orders");
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docnest_memory;

mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
