#![allow(dead_code)]

use async_trait::async_trait;
use docnest::{
    backend::{Created, StoreBackend},
    bson::Bson,
    error::StoreResult,
    link::Link,
    memory::InMemoryStore,
    prelude::Item,
    query::Query,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Barrier;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Item)]
pub struct Widget {
    pub id: String,
    pub name: String,
    pub stock: i32,
}

impl Widget {
    pub fn new(id: &str, name: &str, stock: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stock,
        }
    }
}

/// A view of [`Widget`] that only decodes its name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Item)]
pub struct WidgetName {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Item)]
pub struct Invoice {
    pub id: String,
    pub total: f64,
    pub currency: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Item)]
pub struct Sku {
    #[item(id)]
    #[serde(rename = "id")]
    pub code: String,
    pub label: String,
}

/// Wraps the in-memory store and holds every read that misses `target` at a barrier, so
/// concurrent `ensure` calls all observe the resource as absent before any of them creates it.
#[derive(Debug)]
pub struct RacingStore {
    inner: InMemoryStore,
    target: Link,
    gate: Barrier,
    created: AtomicUsize,
    conflicts: AtomicUsize,
}

impl RacingStore {
    pub fn new(inner: InMemoryStore, target: Link, racers: usize) -> Self {
        Self {
            inner,
            target,
            gate: Barrier::new(racers),
            created: AtomicUsize::new(0),
            conflicts: AtomicUsize::new(0),
        }
    }

    /// Successful creates of the target.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Creates of the target rejected as conflicts.
    pub fn conflicts(&self) -> usize {
        self.conflicts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreBackend for RacingStore {
    async fn create_item(&self, parent: &Link, payload: Bson) -> StoreResult<Created> {
        let result = self.inner.create_item(parent, payload).await;

        match &result {
            Ok(created) if created.link == self.target => {
                self.created.fetch_add(1, Ordering::SeqCst);
            }
            Err(err) if err.is_conflict() => {
                self.conflicts.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }

        result
    }

    async fn read_item(&self, link: &Link) -> StoreResult<Bson> {
        let result = self.inner.read_item(link).await;

        if *link == self.target && matches!(&result, Err(err) if err.is_not_found()) {
            self.gate.wait().await;
        }

        result
    }

    async fn update_item(&self, link: &Link, payload: Bson) -> StoreResult<Bson> {
        self.inner.update_item(link, payload).await
    }

    async fn delete_item(&self, link: &Link) -> StoreResult<()> {
        self.inner.delete_item(link).await
    }

    async fn list_children(&self, parent: &Link) -> StoreResult<Vec<Bson>> {
        self.inner.list_children(parent).await
    }

    async fn query_children(&self, parent: &Link, query: Query) -> StoreResult<Vec<Bson>> {
        self.inner.query_children(parent, query).await
    }
}
