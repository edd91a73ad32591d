//! Lazy, restartable sequences over the children of a resource.

use bson::Bson;
use futures::{
    executor::block_on,
    stream::{self, BoxStream, StreamExt, TryStreamExt},
};
use std::{fmt, sync::Arc};

use crate::{
    backend::StoreBackend,
    error::StoreResult,
    link::Link,
    query::{Predicate, Query, SortDirection, Sort},
};

type Decoder<'a, O> = Arc<dyn Fn(Bson) -> StoreResult<O> + Send + Sync + 'a>;

/// An ordered sequence over the children of one parent.
///
/// Building a listing performs no I/O. Every call to [`Listing::fetch`], [`Listing::first`]
/// or [`Listing::stream`] issues a fresh request, so a listing can be consumed any number of
/// times and each pass observes the store as it is at that moment.
pub struct Listing<'a, O> {
    backend: &'a (dyn StoreBackend + 'a),
    parent: Link,
    query: Query,
    decode: Decoder<'a, O>,
}

impl<'a, O: Send + 'a> Listing<'a, O> {
    pub(crate) fn new<F>(backend: &'a (dyn StoreBackend + 'a), parent: Link, decode: F) -> Self
    where
        F: Fn(Bson) -> StoreResult<O> + Send + Sync + 'a,
    {
        Self {
            backend,
            parent,
            query: Query::new(),
            decode: Arc::new(decode),
        }
    }

    /// The link whose children are listed.
    pub fn parent(&self) -> &Link {
        &self.parent
    }

    /// The request this listing issues.
    pub fn query(&self) -> &Query {
        &self.query
    }

    /// Restricts the listing to children matching `predicate`, in addition to earlier filters.
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.query.predicate = Some(match self.query.predicate.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.query.sort = Some(Sort { field: field.into(), direction });
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.query.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.query.limit = Some(limit);
        self
    }

    /// Issues the request and decodes every child.
    pub async fn fetch(&self) -> StoreResult<Vec<O>> {
        fetch_raw(self.backend, &self.parent, &self.query)
            .await?
            .into_iter()
            .map(|payload| (*self.decode)(payload))
            .collect()
    }

    /// Blocking form of [`Listing::fetch`].
    pub fn fetch_blocking(&self) -> StoreResult<Vec<O>> {
        block_on(self.fetch())
    }

    /// Issues the request with a limit of one and returns the first child, if any.
    pub async fn first(&self) -> StoreResult<Option<O>> {
        let query = Query { limit: Some(1), ..self.query.clone() };

        fetch_raw(self.backend, &self.parent, &query)
            .await?
            .into_iter()
            .next()
            .map(|payload| (*self.decode)(payload))
            .transpose()
    }

    /// Returns a stream that issues the request when first polled.
    pub fn stream(&self) -> BoxStream<'a, StoreResult<O>> {
        let backend = self.backend;
        let parent = self.parent.clone();
        let query = self.query.clone();
        let decode = self.decode.clone();

        stream::once(async move { fetch_raw(backend, &parent, &query).await })
            .map_ok(move |payloads| {
                let decode = decode.clone();
                stream::iter(payloads.into_iter().map(move |payload| (*decode)(payload)))
            })
            .try_flatten()
            .boxed()
    }
}

impl<'a, O> Clone for Listing<'a, O> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend,
            parent: self.parent.clone(),
            query: self.query.clone(),
            decode: self.decode.clone(),
        }
    }
}

impl<'a, O> fmt::Debug for Listing<'a, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listing")
            .field("parent", &self.parent)
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}

async fn fetch_raw(backend: &(dyn StoreBackend + '_), parent: &Link, query: &Query) -> StoreResult<Vec<Bson>> {
    if query.is_unconstrained() {
        backend.list_children(parent).await
    } else {
        backend.query_children(parent, query.clone()).await
    }
}
