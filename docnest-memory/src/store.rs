//! In-memory implementation of the store collaborator.
//!
//! Resources are kept in a map keyed by [`Link`], with a second map recording the children of
//! every parent in creation order. Both live behind one async-aware read-write lock.

use async_trait::async_trait;
use bson::{Bson, Document as BsonDocument};
use chrono::Utc;
use mea::rwlock::RwLock;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::debug;
use uuid::Uuid;

use docnest_core::{
    backend::{Created, StoreBackend, StoreBackendBuilder},
    error::{StoreError, StoreResult},
    item::ID_KEY,
    link::{Link, ResourceKind, validate_id},
    query::Query,
};

use crate::evaluator::{PayloadEvaluator, sort_payloads};

/// Account id reported when the builder does not set one.
pub const DEFAULT_ACCOUNT: &str = "local";

/// Link of the resource, stamped on every stored payload.
pub const SELF_KEY: &str = "_self";
/// Unix timestamp (seconds) of the last write, stamped on every stored payload.
pub const TIMESTAMP_KEY: &str = "_ts";

const SYSTEM_KEYS: [&str; 2] = [SELF_KEY, TIMESTAMP_KEY];

#[derive(Debug, Default)]
struct Tree {
    payloads: HashMap<Link, BsonDocument>,
    children: HashMap<Link, Vec<String>>,
}

impl Tree {
    fn exists(&self, link: &Link) -> bool {
        link.is_root() || self.payloads.contains_key(link)
    }

    fn ensure_exists(&self, link: &Link) -> StoreResult<()> {
        if self.exists(link) {
            Ok(())
        } else {
            Err(StoreError::NotFound(link.clone()))
        }
    }

    /// Validates a create without applying it. The returned link is free in the current tree.
    fn prepare(&self, parent: &Link, payload: Bson) -> StoreResult<(Link, BsonDocument)> {
        self.ensure_exists(parent)?;

        let kind = parent
            .kind()
            .child()
            .ok_or_else(|| StoreError::Validation(format!("{} {} cannot own children", parent.kind(), parent)))?;

        let mut document = into_document(payload)?;

        let id = match document.get_str(ID_KEY) {
            Ok(id) if !id.is_empty() => id.to_string(),
            _ if kind == ResourceKind::Document => Uuid::new_v4().to_string(),
            _ => return Err(StoreError::Validation(format!("a {kind} requires an id"))),
        };

        validate_id(&id)?;
        let link = parent.child(&id)?;

        if self.exists(&link) {
            return Err(StoreError::Conflict(link));
        }

        document.insert(ID_KEY, id);
        stamp(&mut document, &link);

        Ok((link, document))
    }

    fn insert(&mut self, parent: &Link, link: Link, document: BsonDocument) -> Created {
        let id = link.id().unwrap_or_default().to_string();

        self.children
            .entry(parent.clone())
            .or_default()
            .push(id.clone());
        self.payloads.insert(link.clone(), document);

        Created { id, link }
    }

    fn remove_descendants(&mut self, ancestor: &Link) {
        self.payloads
            .retain(|link, _| !link.is_descendant_of(ancestor));
        self.children
            .retain(|link, _| !link.is_descendant_of(ancestor));
        self.children.remove(ancestor);
    }

    fn list(&self, parent: &Link) -> StoreResult<Vec<BsonDocument>> {
        self.ensure_exists(parent)?;

        let Some(ids) = self.children.get(parent) else {
            return Ok(Vec::new());
        };

        ids.iter()
            .map(|id| {
                let link = parent.child(id)?;
                self.payloads
                    .get(&link)
                    .cloned()
                    .ok_or(StoreError::NotFound(link))
            })
            .collect()
    }
}

/// Thread-safe in-memory store backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state, allowing it to be
/// shared across async tasks. Clones share the same underlying tree.
///
/// Batches are validated in full before anything is written, so a failed `create_items` leaves
/// the store unchanged. Queries scan every child of the parent.
#[derive(Clone, Debug)]
pub struct InMemoryStore {
    tree: Arc<RwLock<Tree>>,
    account: Arc<str>,
}

impl InMemoryStore {
    /// Creates an empty store for the default account.
    pub fn new() -> Self {
        Self::with_account(DEFAULT_ACCOUNT)
    }

    fn with_account(account: &str) -> Self {
        Self {
            tree: Arc::new(RwLock::new(Tree::default())),
            account: Arc::from(account),
        }
    }

    /// Creates a builder for constructing an `InMemoryStore` with custom options.
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder::default()
    }

    /// The account id reported when reading the root link.
    pub fn account(&self) -> &str {
        &self.account
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn create_item(&self, parent: &Link, payload: Bson) -> StoreResult<Created> {
        let mut tree = self.tree.write().await;

        let (link, document) = tree.prepare(parent, payload)?;
        let created = tree.insert(parent, link, document);

        debug!(target: "docnest::memory", link = %created.link, "created");

        Ok(created)
    }

    async fn create_items(&self, parent: &Link, payloads: Vec<Bson>) -> StoreResult<Vec<Created>> {
        let mut tree = self.tree.write().await;

        let mut batch = Vec::with_capacity(payloads.len());
        let mut claimed = HashSet::new();

        for payload in payloads {
            let (link, document) = tree.prepare(parent, payload)?;

            if !claimed.insert(link.clone()) {
                return Err(StoreError::Conflict(link));
            }

            batch.push((link, document));
        }

        let created = batch
            .into_iter()
            .map(|(link, document)| tree.insert(parent, link, document))
            .collect::<Vec<_>>();

        debug!(target: "docnest::memory", parent = %parent, count = created.len(), "created batch");

        Ok(created)
    }

    async fn read_item(&self, link: &Link) -> StoreResult<Bson> {
        if link.is_root() {
            let mut account = BsonDocument::new();
            account.insert(ID_KEY, &*self.account);
            return Ok(Bson::Document(account));
        }

        self.tree
            .read()
            .await
            .payloads
            .get(link)
            .cloned()
            .map(Bson::Document)
            .ok_or_else(|| StoreError::NotFound(link.clone()))
    }

    async fn update_item(&self, link: &Link, payload: Bson) -> StoreResult<Bson> {
        let id = link
            .id()
            .ok_or_else(|| StoreError::Validation("the account cannot be updated".into()))?;

        let mut document = into_document(payload)?;

        match document.get_str(ID_KEY) {
            Ok(given) if given != id => {
                return Err(StoreError::Validation(format!(
                    "payload id {given:?} does not match {link}"
                )));
            }
            _ => {
                document.insert(ID_KEY, id);
            }
        }

        stamp(&mut document, link);

        let mut tree = self.tree.write().await;
        let stored = tree
            .payloads
            .get_mut(link)
            .ok_or_else(|| StoreError::NotFound(link.clone()))?;

        *stored = document.clone();

        debug!(target: "docnest::memory", link = %link, "updated");

        Ok(Bson::Document(document))
    }

    async fn delete_item(&self, link: &Link) -> StoreResult<()> {
        let (parent, id) = match (link.parent(), link.id()) {
            (Some(parent), Some(id)) => (parent, id),
            _ => return Err(StoreError::Validation("the account cannot be deleted".into())),
        };

        let mut tree = self.tree.write().await;

        if tree.payloads.remove(link).is_none() {
            return Err(StoreError::NotFound(link.clone()));
        }

        tree.remove_descendants(link);

        if let Some(siblings) = tree.children.get_mut(&parent) {
            siblings.retain(|sibling| sibling.as_str() != id);
        }

        debug!(target: "docnest::memory", link = %link, "deleted");

        Ok(())
    }

    async fn list_children(&self, parent: &Link) -> StoreResult<Vec<Bson>> {
        let tree = self.tree.read().await;

        Ok(tree
            .list(parent)?
            .into_iter()
            .map(Bson::Document)
            .collect())
    }

    async fn query_children(&self, parent: &Link, query: Query) -> StoreResult<Vec<Bson>> {
        let children = self.tree.read().await.list(parent)?;

        let mut selected = match &query.predicate {
            Some(predicate) => {
                let mut selected = Vec::with_capacity(children.len());

                for child in children {
                    if PayloadEvaluator::matches(&child, predicate)? {
                        selected.push(child);
                    }
                }

                selected
            }
            None => children,
        };

        if let Some(sort) = &query.sort {
            sort_payloads(&mut selected, sort);
        }

        Ok(query
            .window(selected)
            .into_iter()
            .map(Bson::Document)
            .collect())
    }

    async fn clear_children(&self, parent: &Link) -> StoreResult<()> {
        let mut tree = self.tree.write().await;

        tree.ensure_exists(parent)?;
        tree.remove_descendants(parent);

        debug!(target: "docnest::memory", parent = %parent, "cleared");

        Ok(())
    }
}

fn into_document(payload: Bson) -> StoreResult<BsonDocument> {
    match payload {
        Bson::Document(document) => Ok(document),
        other => Err(StoreError::Validation(format!(
            "payload must be a document, got {:?}",
            other.element_type()
        ))),
    }
}

/// Replaces caller-supplied system properties with the store's own.
fn stamp(document: &mut BsonDocument, link: &Link) {
    for key in SYSTEM_KEYS {
        document.remove(key);
    }

    document.insert(SELF_KEY, link.as_str());
    document.insert(TIMESTAMP_KEY, Utc::now().timestamp());
}

/// Builder for constructing [`InMemoryStore`] instances.
///
/// # Example
///
/// ```ignore
/// use docnest::memory::InMemoryStore;
/// use docnest::backend::StoreBackendBuilder;
///
/// let store = InMemoryStore::builder().account("dev").build().await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStoreBuilder {
    account: Option<String>,
}

impl InMemoryStoreBuilder {
    /// Sets the account id reported when reading the root link.
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    async fn build(self) -> StoreResult<Self::Backend> {
        let account = self.account.as_deref().unwrap_or(DEFAULT_ACCOUNT);

        validate_id(account).map_err(|err| StoreError::Initialization(err.to_string()))?;

        Ok(InMemoryStore::with_account(account))
    }
}
