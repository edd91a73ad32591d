//! A typed resource tree over a remote document store.
//!
//! The tree has four levels, account → database → collection → document, and each level is a
//! lightweight handle that borrows its parent. This crate is the core of the docnest project and
//! provides:
//!
//! - **Schema marker** ([`item`]) - The [`Item`](item::Item) trait every payload type implements
//! - **Link resolver** ([`link`]) - Canonical addresses computed from the ancestor chain
//! - **Store backend abstraction** ([`backend`]) - The collaborator contract backends implement
//! - **Capabilities** ([`capability`]) - Small composable contracts the hierarchy levels intersect
//! - **Hierarchy** ([`account`], [`database`], [`collection`], [`document`]) - The four wrappers
//! - **Query and filtering API** ([`query`], [`listing`]) - Predicates and lazy child sequences
//! - **Change tracking** ([`changes`]) - "New children" polling with a synchronized cursor
//! - **Error handling** ([`error`]) - The store error taxonomy
//!
//! Handles perform no I/O until an operation runs. Ensure (get-or-create) reconciles a handle
//! with the store, and a cast re-types a handle without touching the store.

#[allow(unused_extern_crates)]
extern crate self as docnest_core;

pub mod account;
pub mod backend;
pub mod capability;
pub mod changes;
pub mod collection;
pub mod database;
pub mod document;
pub mod error;
pub mod item;
pub mod link;
pub mod listing;
pub mod query;

mod cast;
mod materialize;
