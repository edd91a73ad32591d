//! MongoDB store backend for docnest.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait. The account
//! maps to a MongoDB deployment, databases to MongoDB databases, collections to MongoDB
//! collections and documents to MongoDB documents keyed by `_id`.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docnest = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Features
//!
//! - **Persistent storage** - Data is persisted to MongoDB Atlas or self-hosted MongoDB
//! - **Predicate pushdown** - Predicates are translated into MongoDB filter documents
//! - **Conflict detection** - Duplicate key errors surface as `Conflict`
//! - **Reversible naming** - Ids and payload keys MongoDB rejects are percent-escaped
//!
//! # Example
//!
//! ```ignore
//! use docnest::{prelude::*, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> StoreResult<()> {
//!     let account = Account::connect(
//!         MongoDbStore::builder("mongodb://localhost:27017").account("shop"),
//!     )
//!     .await?;
//!
//!     account.database("orders").ensure().await?;
//!     account.shutdown().await
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docnest_mongodb;

mod query;
mod sanitizer;
pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
