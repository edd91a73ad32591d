//! Per-collection memory of surfaced child identifiers.

use bson::Bson;
use mea::mutex::Mutex;
use std::{collections::HashSet, fmt, future::Future};
use tracing::{debug, warn};

use crate::{error::StoreResult, item::payload_id};

/// The set of child ids a collection wrapper has already reported as new.
///
/// The set only grows, and only by ids actually returned from a listing. It lives in memory;
/// a fresh wrapper starts empty.
pub struct ChangeCursor {
    seen: Mutex<HashSet<String>>,
}

impl ChangeCursor {
    pub fn new() -> Self {
        Self { seen: Mutex::new(HashSet::new()) }
    }

    /// Lists the current children through `list`, decodes those not seen before with `decode`
    /// and returns them in listing order.
    ///
    /// The lock is held across the listing, so concurrent callers are serialized and each new
    /// id is reported by exactly one of them. Ids are recorded only once every fresh child has
    /// decoded: if `decode` fails, the error is returned and the cursor is left as it was.
    pub async fn advance<F, Fut, D, O>(&self, list: F, decode: D) -> StoreResult<Vec<O>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StoreResult<Vec<Bson>>>,
        D: Fn(Bson) -> StoreResult<O>,
    {
        let mut seen = self.seen.lock().await;
        let current = list().await?;
        let listed = current.len();

        let mut surfaced = HashSet::new();
        let mut fresh = Vec::new();

        for payload in current {
            let Some(id) = payload_id(&payload).map(str::to_string) else {
                warn!(target: "docnest::changes", "skipping child without an id");
                continue;
            };

            if seen.contains(&id) || !surfaced.insert(id) {
                continue;
            }

            fresh.push(decode(payload)?);
        }

        seen.extend(surfaced);

        debug!(target: "docnest::changes", listed, surfaced = fresh.len(), "advanced change cursor");

        Ok(fresh)
    }

    /// Number of ids surfaced so far.
    pub async fn len(&self) -> usize {
        self.seen.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Forgets every surfaced id; the next advance reports all children again.
    pub async fn reset(&self) {
        self.seen.lock().await.clear();
    }
}

impl Default for ChangeCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChangeCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeCursor").finish_non_exhaustive()
    }
}
