//! In-memory store implementations.
//!
//! These back the engine's own tests and let callers exercise the
//! synchronization policy without PostgreSQL, Redis or OpenSearch. Each store
//! can be switched into a failing state to simulate an outage.

use crate::store::{Cache, PrimaryStore, SearchIndex};
use crate::{Account, AccountId, NewAccount, RowsAffected, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

fn outage(store: &str) -> StoreError {
    StoreError::Unavailable(format!("{store} is offline"))
}

/// Primary store keeping rows (tombstones included) in a map.
pub struct MemoryPrimaryStore {
    rows: DashMap<AccountId, Account>,
    next_id: AtomicU64,
    offline: AtomicBool,
}

impl MemoryPrimaryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            next_id: AtomicU64::new(1),
            offline: AtomicBool::new(false),
        }
    }

    /// Make every call fail (`true`) or succeed again (`false`).
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Raw row lookup that also sees tombstones.
    pub fn row(&self, id: AccountId) -> Option<Account> {
        self.rows.get(&id).map(|r| r.value().clone())
    }

    /// Number of rows, tombstones included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(outage("primary store"));
        }
        Ok(())
    }
}

impl Default for MemoryPrimaryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PrimaryStore for MemoryPrimaryStore {
    async fn insert(&self, account: NewAccount) -> Result<(Account, RowsAffected), StoreError> {
        self.check()?;
        let now = Utc::now();
        let row = Account {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            created_at: now,
            updated_at: now,
            deleted_at: None,
            name: account.name,
            balance: account.balance,
        };
        self.rows.insert(row.id, row.clone());
        Ok((row, 1))
    }

    async fn find_by_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.check()?;
        Ok(self
            .rows
            .get(&id)
            .filter(|r| !r.is_deleted())
            .map(|r| r.value().clone()))
    }

    async fn scan_all(&self) -> Result<Vec<Account>, StoreError> {
        self.check()?;
        let mut live: Vec<Account> = self
            .rows
            .iter()
            .filter(|r| !r.is_deleted())
            .map(|r| r.value().clone())
            .collect();
        live.sort_by_key(|a| a.id);
        Ok(live)
    }

    async fn save(&self, account: &mut Account) -> Result<RowsAffected, StoreError> {
        self.check()?;
        match self.rows.get_mut(&account.id) {
            Some(mut row) if !row.is_deleted() => {
                account.updated_at = Utc::now();
                row.name = account.name.clone();
                row.balance = account.balance;
                row.updated_at = account.updated_at;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn soft_delete(&self, account: &mut Account) -> Result<RowsAffected, StoreError> {
        self.check()?;
        match self.rows.get_mut(&account.id) {
            Some(mut row) if !row.is_deleted() => {
                let now = Utc::now();
                row.deleted_at = Some(now);
                account.deleted_at = Some(now);
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}

/// Cache backed by a concurrent map, with per-command failure switches.
pub struct MemoryCache {
    entries: DashMap<String, String>,
    fail_gets: AtomicBool,
    fail_sets: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            fail_gets: AtomicBool::new(false),
            fail_sets: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    /// Fail every command (`true`) or none (`false`).
    pub fn set_offline(&self, offline: bool) {
        self.fail_gets.store(offline, Ordering::SeqCst);
        self.fail_sets.store(offline, Ordering::SeqCst);
        self.fail_deletes.store(offline, Ordering::SeqCst);
    }

    pub fn fail_sets(&self, fail: bool) {
        self.fail_sets.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Read an entry without going through the failure switches.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    /// Write an entry directly, e.g. to plant a stale value.
    pub fn seed(&self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(outage("cache"));
        }
        Ok(self.peek(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_sets.load(Ordering::SeqCst) {
            return Err(outage("cache"));
        }
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(outage("cache"));
        }
        self.entries.remove(key);
        Ok(())
    }
}

/// Search index matching the query case-insensitively against the string
/// fields of each document.
pub struct MemorySearchIndex {
    documents: DashMap<(String, AccountId), String>,
    offline: AtomicBool,
}

impl MemorySearchIndex {
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            offline: AtomicBool::new(false),
        }
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn document(&self, index: &str, id: AccountId) -> Option<String> {
        self.documents
            .get(&(index.to_string(), id))
            .map(|d| d.value().clone())
    }

    /// Insert a document directly, bypassing the failure switch.
    pub fn seed(&self, index: &str, id: AccountId, document: impl Into<String>) {
        self.documents
            .insert((index.to_string(), id), document.into());
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(outage("search index"));
        }
        Ok(())
    }
}

impl Default for MemorySearchIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_text(document: &str, needle: &str) -> bool {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(document) else {
        return document.to_lowercase().contains(needle);
    };
    match value {
        serde_json::Value::Object(fields) => fields.values().any(|v| {
            v.as_str()
                .is_some_and(|s| s.to_lowercase().contains(needle))
        }),
        _ => false,
    }
}

#[async_trait]
impl SearchIndex for MemorySearchIndex {
    async fn upsert(&self, index: &str, id: AccountId, document: &str) -> Result<(), StoreError> {
        self.check()?;
        self.documents
            .insert((index.to_string(), id), document.to_string());
        Ok(())
    }

    async fn delete(&self, index: &str, id: AccountId) -> Result<(), StoreError> {
        self.check()?;
        self.documents.remove(&(index.to_string(), id));
        Ok(())
    }

    async fn search(&self, index: &str, query: &str) -> Result<Vec<AccountId>, StoreError> {
        self.check()?;
        let needle = query.to_lowercase();
        let mut hits: Vec<AccountId> = self
            .documents
            .iter()
            .filter(|d| d.key().0 == index && matches_text(d.value(), &needle))
            .map(|d| d.key().1)
            .collect();
        hits.sort_unstable();
        Ok(hits)
    }
}
