//! Account model and the payloads that create or change one.

use crate::{AccountId, RowsAffected};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The canonical account record as held by the primary store.
///
/// The JSON form of this struct is what gets written to the cache and the
/// search index. `deleted_at` never leaves the primary store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Assigned by the primary store on insert, never reused
    pub id: AccountId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Tombstone marker; a set value hides the row from normal queries
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub name: String,
    pub balance: f64,
}

impl Account {
    /// Whether the account has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Apply a change set in place.
    pub fn apply(&mut self, changes: AccountChanges) {
        self.name = changes.name;
        self.balance = changes.balance;
    }

    /// Serialize to the projection stored in the cache and the search index.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Fields supplied when creating an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub balance: f64,
}

impl NewAccount {
    pub fn new(name: impl Into<String>, balance: f64) -> Self {
        Self {
            name: name.into(),
            balance,
        }
    }
}

/// Replacement values for the mutable fields of an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountChanges {
    pub name: String,
    pub balance: f64,
}

impl AccountChanges {
    pub fn new(name: impl Into<String>, balance: f64) -> Self {
        Self {
            name: name.into(),
            balance,
        }
    }
}

/// Outcome of a write against the primary store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteSummary {
    pub id: AccountId,
    pub rows_affected: RowsAffected,
}
