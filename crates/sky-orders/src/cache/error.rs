//! Error types for the read-through cache.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    /// A value could not be serialised for storage.
    #[error("Cache codec error for {key}: {reason}")]
    Codec { key: String, reason: String },

    /// Waiting for another caller's load of the same key took too long.
    #[error("Timed out after {waited:?} waiting for the in-flight load of {key}")]
    LockTimeout { key: String, waited: Duration },

    /// The backing query failed. Nothing was written to the cache.
    #[error("Backing store query for {key} failed: {source}")]
    BackingStore {
        key: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl CacheError {
    /// Returns the backing store's error if it is of type `E`.
    pub fn backing_error<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::BackingStore { source, .. } => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}
