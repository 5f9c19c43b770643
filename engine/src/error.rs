//! Error types for the finance engine.
//!
//! Two families exist. [`Error`] is fatal: it short-circuits an operation and
//! reaches the caller. [`SoftError`] describes a cache or search index failure
//! that was tolerated; it travels next to a successful result.

use crate::AccountId;
use std::fmt;
use thiserror::Error;

/// Failure reported by a store backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("connection unavailable: {0}")]
    Unavailable(String),

    #[error("backend error: {0}")]
    Backend(String),

    /// The store answered, but with a value that does not decode.
    #[error("undecodable entry: {0}")]
    Corrupt(String),
}

/// Fatal errors from the synchronization core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Lookup errors
    #[error("account not found: {0}")]
    NotFound(AccountId),

    #[error("lookup of account {id} failed: {source}")]
    Lookup { id: AccountId, source: StoreError },

    #[error("accounts unavailable: {0}")]
    Unavailable(StoreError),

    // Write errors
    #[error("primary store write failed: {0}")]
    Store(StoreError),

    // Search errors
    #[error("search unavailable: {0}")]
    SearchUnavailable(StoreError),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Whether the error means the requested account does not exist (or could
    /// not be located).
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::Lookup { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A derived store whose failures are tolerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedStore {
    Cache,
    SearchIndex,
}

impl DerivedStore {
    pub fn as_str(&self) -> &'static str {
        match self {
            DerivedStore::Cache => "cache",
            DerivedStore::SearchIndex => "search_index",
        }
    }
}

impl fmt::Display for DerivedStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The call made against a derived store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DerivedOp {
    Get,
    Set,
    Delete,
    Upsert,
}

impl DerivedOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            DerivedOp::Get => "get",
            DerivedOp::Set => "set",
            DerivedOp::Delete => "delete",
            DerivedOp::Upsert => "upsert",
        }
    }
}

impl fmt::Display for DerivedOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tolerated failure of a cache or search index call.
///
/// `target` is the cache key or the index document id.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{store} {operation} failed for '{target}': {source}")]
pub struct SoftError {
    pub store: DerivedStore,
    pub operation: DerivedOp,
    pub target: String,
    pub source: StoreError,
}

impl SoftError {
    pub fn new(
        store: DerivedStore,
        operation: DerivedOp,
        target: impl Into<String>,
        source: StoreError,
    ) -> Self {
        Self {
            store,
            operation,
            target: target.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::NotFound(42);
        assert_eq!(err.to_string(), "account not found: 42");

        let err = Error::Store(StoreError::Backend("duplicate key".into()));
        assert_eq!(
            err.to_string(),
            "primary store write failed: backend error: duplicate key"
        );

        let err = Error::Lookup {
            id: 3,
            source: StoreError::Unavailable("pool timed out".into()),
        };
        assert_eq!(
            err.to_string(),
            "lookup of account 3 failed: connection unavailable: pool timed out"
        );
    }

    #[test]
    fn not_found_covers_failed_lookups() {
        assert!(Error::NotFound(1).is_not_found());
        assert!(Error::Lookup {
            id: 1,
            source: StoreError::Backend("x".into())
        }
        .is_not_found());
        assert!(!Error::Store(StoreError::Backend("x".into())).is_not_found());
    }

    #[test]
    fn soft_error_display() {
        let err = SoftError::new(
            DerivedStore::Cache,
            DerivedOp::Set,
            "accounts:1",
            StoreError::Unavailable("connection refused".into()),
        );
        assert_eq!(
            err.to_string(),
            "cache set failed for 'accounts:1': connection unavailable: connection refused"
        );
    }
}
