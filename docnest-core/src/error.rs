//! Error types and result types for resource tree operations.
//!
//! Every fallible operation in this crate returns a [`StoreResult<T>`]. The variants of
//! [`StoreError`] follow the failure taxonomy of the store collaborator: missing links,
//! identifier collisions, invalid payloads, incompatible casts and transient backend failures.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

use crate::link::Link;

/// Represents all possible errors that can occur when working with the resource tree.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The link does not resolve to an existing resource.
    #[error("Resource not found: {0}")]
    NotFound(Link),
    /// A create collided with an existing identifier under the same parent.
    #[error("Resource already exists: {0}")]
    Conflict(Link),
    /// The payload is missing a required identifier or violates the item schema contract.
    #[error("Validation error: {0}")]
    Validation(String),
    /// The requested re-typing is not a refinement of the source schema.
    #[error("Cannot cast {from} to {to}: {reason}")]
    CastIncompatible {
        /// Type name of the source schema.
        from: &'static str,
        /// Type name of the requested schema.
        to: &'static str,
        /// Why the source shape does not decode as the target.
        reason: String,
    },
    /// Network or backend failure. Callers may retry.
    #[error("Transient store error: {0}")]
    Transient(String),
    /// Serialization/deserialization error when converting payloads (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during backend initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
}

/// A specialized `Result` type for resource tree operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    /// Returns `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Returns `true` for [`StoreError::Conflict`].
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }

    /// Returns `true` when retrying the same call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

impl From<BsonError> for StoreError {
    fn from(err: BsonError) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for StoreError {
    fn from(err: SerdeJsonError) -> Self {
        StoreError::Serialization(err.to_string())
    }
}
