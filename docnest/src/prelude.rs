//! Convenient re-exports of commonly used types from docnest.
//!
//! Import this prelude module to quickly access the most frequently used types
//! and traits without needing to import from multiple sub-modules:
//!
//! ```ignore
//! use docnest::prelude::*;
//! ```
//!
//! This provides access to:
//! - The hierarchy wrappers and the capability traits they implement
//! - The schema marker trait and its derive
//! - Store backends and builders
//! - Predicate construction and listings
//! - Error types

pub use docnest_core::{
    account::Account,
    backend::{Created, StoreBackend, StoreBackendBuilder},
    capability::{
        Addable, Clearable, Createable, Deleteable, Editable, Ensure, Queryable, QueryableWrapped, Readable, Resource,
        Trackable, Updateable,
    },
    collection::Collection,
    database::Database,
    document::Document,
    error::{StoreError, StoreResult},
    item::{AccountInfo, CollectionInfo, DatabaseInfo, Item, ItemExt, RawItem},
    link::{Link, ResourceKind},
    listing::Listing,
    query::{FieldOp, Filter, Predicate, PredicateVisitor, Query, Sort, SortDirection},
};

pub use docnest_macros::Item;
