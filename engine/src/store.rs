//! Store interfaces consumed by the synchronizer.
//!
//! Implementations must be safe to share across concurrent requests; any
//! pooling or locking is their concern, not the synchronizer's.

use crate::{Account, AccountId, NewAccount, RowsAffected, StoreError};
use async_trait::async_trait;

/// The durable source of truth for accounts.
///
/// Lookups and scans never return soft-deleted rows.
#[async_trait]
pub trait PrimaryStore: Send + Sync {
    /// Insert a new account and return it with its assigned id and timestamps.
    async fn insert(&self, account: NewAccount) -> Result<(Account, RowsAffected), StoreError>;

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    /// All live accounts ordered by id.
    async fn scan_all(&self) -> Result<Vec<Account>, StoreError>;

    /// Persist the mutable fields of `account`, refreshing `updated_at`.
    async fn save(&self, account: &mut Account) -> Result<RowsAffected, StoreError>;

    /// Mark `account` deleted, setting `deleted_at`.
    async fn soft_delete(&self, account: &mut Account) -> Result<RowsAffected, StoreError>;
}

/// Key-value cache holding serialized projections. Entries never expire.
#[async_trait]
pub trait Cache: Send + Sync {
    /// `Ok(None)` is a miss.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Best-effort document index used for free-text search.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn upsert(&self, index: &str, id: AccountId, document: &str) -> Result<(), StoreError>;
    async fn delete(&self, index: &str, id: AccountId) -> Result<(), StoreError>;

    /// Ids of the documents matching `query`, best match first.
    async fn search(&self, index: &str, query: &str) -> Result<Vec<AccountId>, StoreError>;
}
