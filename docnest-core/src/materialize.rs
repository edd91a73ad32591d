//! Get-or-create reconciliation of a wrapper with the store.

use bson::Bson;
use tracing::{debug, info};

use crate::{
    backend::StoreBackend,
    error::{StoreError, StoreResult},
    link::Link,
};

/// Reads `link`, creating it from `default` when absent.
///
/// A `Conflict` on create means a concurrent caller created the resource between our read and
/// our create; it is answered with a second read instead of being propagated. Every other error
/// surfaces unchanged. The existing payload is never written.
pub(crate) async fn get_or_create<B>(backend: &B, link: &Link, default: Bson) -> StoreResult<Bson>
where
    B: StoreBackend + ?Sized,
{
    match backend.read_item(link).await {
        Ok(existing) => {
            debug!(target: "docnest::ensure", link = %link, "resource already present");
            return Ok(existing);
        }
        Err(err) if err.is_not_found() => {}
        Err(err) => return Err(err),
    }

    let parent = link
        .parent()
        .ok_or_else(|| StoreError::Validation("the account cannot be created".into()))?;

    match backend.create_item(&parent, default.clone()).await {
        Ok(created) => {
            info!(target: "docnest::ensure", link = %created.link, "resource created");
            Ok(default)
        }
        Err(err) if err.is_conflict() => {
            debug!(target: "docnest::ensure", link = %link, "lost creation race, reading winner");
            backend.read_item(link).await
        }
        Err(err) => Err(err),
    }
}
