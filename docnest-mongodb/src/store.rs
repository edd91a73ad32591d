//! MongoDB implementation of the store collaborator.
//!
//! # Layout
//!
//! Every parent link maps to one MongoDB collection holding its children as records:
//!
//! | Parent | MongoDB collection |
//! |---|---|
//! | account | `_docnest-<account>._docnest` (the catalog) |
//! | database `d` | `<d>._docnest` |
//! | collection `c` of `d` | `<d>.<c>` |
//!
//! Database ids are escaped so they never collide with the catalog database or with the
//! databases MongoDB reserves (`admin`, `local`, `config`).
//!
//! A record is the payload with `id` stored as `_id` and an `_order` object id recording
//! creation order. Deleting a database drops its MongoDB database; deleting a collection drops
//! its MongoDB collection.

use async_trait::async_trait;
use bson::{Bson, Document, doc, oid::ObjectId};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{ClientOptions, FindOptions},
};
use tracing::{debug, warn};
use uuid::Uuid;

use docnest_core::{
    backend::{Created, StoreBackend, StoreBackendBuilder},
    error::{StoreError, StoreResult},
    item::ID_KEY,
    link::{Link, ResourceKind, validate_id},
    query::{PredicateVisitor, Query, SortDirection},
};

use crate::{
    query::MongoQueryTranslator,
    sanitizer::{METADATA, NameSanitizer},
};

/// Account name used when the builder does not set one. It names the catalog database.
///
/// The catalog of the default account is the MongoDB database `_docnest-docnest`.
pub const DEFAULT_ACCOUNT: &str = "docnest";

const ORDER_KEY: &str = "_order";
const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
    account: String,
}

impl MongoDbStore {
    pub fn new(client: Client, account: impl Into<String>) -> Self {
        Self {
            client,
            account: account.into(),
        }
    }

    pub fn builder(dsn: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn)
    }

    /// The MongoDB collection holding the children of `parent`.
    fn children_of(&self, parent: &Link) -> StoreResult<MongoCollection<Document>> {
        match parent.components()?.as_slice() {
            [] => Ok(self
                .client
                .database(&NameSanitizer::catalog(&self.account))
                .collection(METADATA)),
            [(_, database)] => Ok(self
                .client
                .database(&NameSanitizer::database(database))
                .collection(METADATA)),
            [(_, database), (_, collection)] => Ok(self
                .client
                .database(&NameSanitizer::database(database))
                .collection(&NameSanitizer::collection(collection))),
            _ => Err(StoreError::Validation(format!("{} {} cannot own children", parent.kind(), parent))),
        }
    }

    /// The MongoDB collection holding `link`, and the record id inside it.
    fn locate<'l>(&self, link: &'l Link) -> StoreResult<(MongoCollection<Document>, &'l str)> {
        link.components()?;

        match (link.parent(), link.id()) {
            (Some(parent), Some(id)) => Ok((self.children_of(&parent)?, id)),
            _ => Err(StoreError::Validation("the account cannot be addressed as a record".into())),
        }
    }

    async fn find_record(&self, link: &Link) -> StoreResult<Option<Document>> {
        let (collection, id) = self.locate(link)?;

        collection
            .find_one(doc! { "_id": id })
            .await
            .map_err(transient)
    }

    async fn ensure_exists(&self, link: &Link) -> StoreResult<()> {
        if link.is_root() {
            return Ok(());
        }

        match self.find_record(link).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(link.clone())),
        }
    }

    /// Drops whatever MongoDB keeps below `link` besides its record.
    async fn drop_subtree(&self, link: &Link) -> StoreResult<()> {
        match link.components()?.as_slice() {
            [(_, database)] => self
                .client
                .database(&NameSanitizer::database(database))
                .drop()
                .await
                .map_err(transient),
            [_, _] => self.children_of(link)?.drop().await.map_err(transient),
            _ => Ok(()),
        }
    }

    async fn find(&self, parent: &Link, filter: Document, options: FindOptions) -> StoreResult<Vec<Bson>> {
        self.ensure_exists(parent).await?;

        self.children_of(parent)?
            .find(filter)
            .with_options(options)
            .await
            .map_err(transient)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(transient)?
            .into_iter()
            .map(from_record)
            .collect()
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn create_item(&self, parent: &Link, payload: Bson) -> StoreResult<Created> {
        let kind = parent
            .kind()
            .child()
            .ok_or_else(|| StoreError::Validation(format!("{} {} cannot own children", parent.kind(), parent)))?;

        let mut document = into_document(payload)?;

        let id = match document.remove(ID_KEY) {
            Some(Bson::String(id)) if !id.is_empty() => id,
            _ if kind == ResourceKind::Document => Uuid::new_v4().to_string(),
            _ => return Err(StoreError::Validation(format!("a {kind} requires an id"))),
        };

        validate_id(&id)?;
        let link = parent.child(&id)?;

        self.ensure_exists(parent).await?;

        let mut record = to_record(&id, document);
        record.insert(ORDER_KEY, ObjectId::new());

        self.children_of(parent)?
            .insert_one(record)
            .await
            .map_err(|err| {
                if is_duplicate_key(&err) {
                    StoreError::Conflict(link.clone())
                } else {
                    transient(err)
                }
            })?;

        debug!(target: "docnest::mongodb", link = %link, "created");

        Ok(Created { id, link })
    }

    async fn read_item(&self, link: &Link) -> StoreResult<Bson> {
        if link.is_root() {
            return Ok(Bson::Document(doc! { "id": self.account.as_str() }));
        }

        self.find_record(link)
            .await?
            .map(from_record)
            .transpose()?
            .ok_or_else(|| StoreError::NotFound(link.clone()))
    }

    async fn update_item(&self, link: &Link, payload: Bson) -> StoreResult<Bson> {
        let (collection, id) = self.locate(link)?;
        let mut document = into_document(payload)?;

        match document.remove(ID_KEY) {
            Some(Bson::String(given)) if given != id => {
                return Err(StoreError::Validation(format!("payload id {given:?} does not match {link}")));
            }
            _ => {}
        }

        let existing = collection
            .find_one(doc! { "_id": id })
            .await
            .map_err(transient)?
            .ok_or_else(|| StoreError::NotFound(link.clone()))?;

        let mut record = to_record(id, document);
        if let Some(order) = existing.get(ORDER_KEY) {
            record.insert(ORDER_KEY, order.clone());
        }

        let result = collection
            .replace_one(doc! { "_id": id }, record.clone())
            .await
            .map_err(transient)?;

        if result.matched_count == 0 {
            return Err(StoreError::NotFound(link.clone()));
        }

        debug!(target: "docnest::mongodb", link = %link, "updated");

        from_record(record)
    }

    async fn delete_item(&self, link: &Link) -> StoreResult<()> {
        let (collection, id) = self.locate(link)?;

        let result = collection
            .delete_one(doc! { "_id": id })
            .await
            .map_err(transient)?;

        if result.deleted_count == 0 {
            return Err(StoreError::NotFound(link.clone()));
        }

        self.drop_subtree(link).await?;

        debug!(target: "docnest::mongodb", link = %link, "deleted");

        Ok(())
    }

    async fn list_children(&self, parent: &Link) -> StoreResult<Vec<Bson>> {
        let mut options = FindOptions::default();
        options.sort = Some(doc! { ORDER_KEY: 1 });

        self.find(parent, doc! {}, options).await
    }

    async fn query_children(&self, parent: &Link, query: Query) -> StoreResult<Vec<Bson>> {
        let filter = match &query.predicate {
            Some(predicate) => MongoQueryTranslator.visit(predicate)?,
            None => doc! {},
        };

        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }
        if let Some(skip) = query.offset {
            options.skip = Some(skip as u64);
        }

        options.sort = Some(match &query.sort {
            Some(sort) => {
                let field = MongoQueryTranslator::field_path(&sort.field);
                let direction = match sort.direction {
                    SortDirection::Asc => 1,
                    SortDirection::Desc => -1,
                };

                doc! { field: direction, ORDER_KEY: 1 }
            }
            None => doc! { ORDER_KEY: 1 },
        });

        self.find(parent, filter, options).await
    }

    async fn clear_children(&self, parent: &Link) -> StoreResult<()> {
        self.ensure_exists(parent).await?;

        if parent.kind() != ResourceKind::Collection {
            for child in self.list_children(parent).await? {
                let Some(id) = child.as_document().and_then(|child| child.get_str(ID_KEY).ok()) else {
                    warn!(target: "docnest::mongodb", parent = %parent, "skipping child without an id");
                    continue;
                };

                self.drop_subtree(&parent.child(id)?).await?;
            }
        }

        self.children_of(parent)?
            .delete_many(doc! {})
            .await
            .map_err(transient)?;

        debug!(target: "docnest::mongodb", parent = %parent, "cleared");

        Ok(())
    }

    async fn shutdown(&self) -> StoreResult<()> {
        self.client.clone().shutdown().await;

        Ok(())
    }
}

fn transient(err: MongoError) -> StoreError {
    StoreError::Transient(err.to_string())
}

pub(crate) fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

fn into_document(payload: Bson) -> StoreResult<Document> {
    match payload {
        Bson::Document(document) => Ok(document),
        other => Err(StoreError::Validation(format!(
            "payload must be a document, got {:?}",
            other.element_type()
        ))),
    }
}

/// Builds the stored record for a payload whose `id` has already been taken out.
fn to_record(id: &str, mut payload: Document) -> Document {
    payload.remove("_id");
    payload.remove(ORDER_KEY);

    let mut record = doc! { "_id": id };
    for (key, value) in NameSanitizer::sanitize_keys(payload) {
        record.insert(key, value);
    }
    record
}

fn from_record(mut record: Document) -> StoreResult<Bson> {
    let id = match record.remove("_id") {
        Some(Bson::String(id)) => id,
        other => {
            return Err(StoreError::Serialization(format!("record has a non-string _id: {other:?}")));
        }
    };
    record.remove(ORDER_KEY);

    let mut payload = doc! { ID_KEY: id };
    for (key, value) in NameSanitizer::restore_keys(record) {
        payload.insert(key, value);
    }

    Ok(Bson::Document(payload))
}

/// Builder for [`MongoDbStore`].
///
/// # Example
///
/// ```ignore
/// use docnest::{backend::StoreBackendBuilder, mongodb::MongoDbStore};
///
/// let store = MongoDbStore::builder("mongodb://localhost:27017")
///     .account("shop")
///     .build()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct MongoDbStoreBuilder {
    dsn: String,
    account: String,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            account: DEFAULT_ACCOUNT.to_string(),
        }
    }

    /// Sets the account name, which selects the catalog database `_docnest-<account>`.
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = account.into();
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> StoreResult<Self::Backend> {
        validate_id(&self.account).map_err(|err| StoreError::Initialization(err.to_string()))?;

        let client = Client::with_options(
            ClientOptions::parse(&self.dsn)
                .await
                .map_err(|e| StoreError::Initialization(e.to_string()))?,
        )
        .map_err(|e| StoreError::Initialization(e.to_string()))?;

        Ok(MongoDbStore::new(client, self.account))
    }
}
