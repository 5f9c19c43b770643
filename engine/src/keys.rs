//! Cache key scheme.
//!
//! Single accounts live under `"<prefix>:<id>"`. The collection snapshot
//! lives under one fixed key that must never fall inside that space.

use crate::{AccountId, Error, Result};

/// Default prefix for single-account keys.
pub const DEFAULT_KEY_PREFIX: &str = "accounts";

/// Default key for the "all accounts" snapshot.
pub const DEFAULT_ALL_KEY: &str = "accounts:all";

/// Builds the cache keys used by the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    prefix: String,
    all: String,
}

impl CacheKeys {
    /// Create a key scheme, rejecting an "all" key that a single-account key
    /// could produce.
    pub fn new(prefix: impl Into<String>, all: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        let all = all.into();

        if prefix.is_empty() {
            return Err(Error::InvalidInput("cache key prefix is empty".into()));
        }
        if all.is_empty() {
            return Err(Error::InvalidInput("collection cache key is empty".into()));
        }

        let collides = all
            .strip_prefix(prefix.as_str())
            .and_then(|rest| rest.strip_prefix(':'))
            .is_some_and(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()));
        if collides {
            return Err(Error::InvalidInput(format!(
                "collection cache key '{all}' overlaps the '{prefix}:<id>' key space"
            )));
        }

        Ok(Self { prefix, all })
    }

    /// Key of a single account.
    pub fn account(&self, id: AccountId) -> String {
        format!("{}:{}", self.prefix, id)
    }

    /// Key of the "all accounts" snapshot.
    pub fn all(&self) -> &str {
        &self.all
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for CacheKeys {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            all: DEFAULT_ALL_KEY.to_string(),
        }
    }
}
