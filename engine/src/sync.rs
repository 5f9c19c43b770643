//! The synchronizer - one routine per CRUD verb over the three stores.
//!
//! Every routine follows the same shape: the primary store decides the
//! outcome, derived stores are brought in line afterwards, and any failure of
//! a derived store is collected as a [`SoftError`] instead of failing the
//! call.
//!
//! Concurrent writes to the same id are not serialized here. Two updates can
//! interleave so that the cache keeps the older of the two values until the
//! next write or delete of that id.

use crate::error::{DerivedOp, DerivedStore};
use crate::keys::CacheKeys;
use crate::store::{Cache, PrimaryStore, SearchIndex};
use crate::{
    Account, AccountChanges, AccountId, Error, NewAccount, Result, SoftError, StoreError,
    WriteSummary,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Default search index name.
pub const DEFAULT_INDEX_NAME: &str = "accounts";

/// Where a read was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Primary,
}

/// A serialized read result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// JSON body, verbatim from the cache on a hit
    pub body: String,
    pub source: Source,
}

impl Fetched {
    /// Parse the body as a single account.
    pub fn account(&self) -> Result<Account> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Parse the body as a list of accounts.
    pub fn accounts(&self) -> Result<Vec<Account>> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// A successful result together with the derived-store failures tolerated
/// while producing it.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct Synced<T> {
    pub value: T,
    pub soft_errors: Vec<SoftError>,
}

impl<T> Synced<T> {
    /// Whether every derived store call succeeded.
    pub fn is_clean(&self) -> bool {
        self.soft_errors.is_empty()
    }
}

/// Collects soft errors over the course of one operation.
#[derive(Default)]
struct SoftErrors(Vec<SoftError>);

impl SoftErrors {
    fn absorb<T>(
        &mut self,
        store: DerivedStore,
        operation: DerivedOp,
        target: &str,
        result: std::result::Result<T, StoreError>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(source) => {
                self.0.push(SoftError::new(store, operation, target, source));
                None
            }
        }
    }

    fn finish<T>(self, value: T) -> Synced<T> {
        Synced {
            value,
            soft_errors: self.0,
        }
    }
}

/// Orchestrates the primary store, the cache and the search index.
///
/// Cheap to clone; store handles are shared.
#[derive(Clone)]
pub struct Synchronizer {
    primary: Arc<dyn PrimaryStore>,
    cache: Arc<dyn Cache>,
    index: Arc<dyn SearchIndex>,
    keys: CacheKeys,
    index_name: String,
}

/// Builder for [`Synchronizer`].
pub struct SynchronizerBuilder {
    primary: Arc<dyn PrimaryStore>,
    cache: Arc<dyn Cache>,
    index: Arc<dyn SearchIndex>,
    keys: CacheKeys,
    index_name: String,
}

impl SynchronizerBuilder {
    pub fn keys(mut self, keys: CacheKeys) -> Self {
        self.keys = keys;
        self
    }

    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = name.into();
        self
    }

    pub fn build(self) -> Synchronizer {
        Synchronizer {
            primary: self.primary,
            cache: self.cache,
            index: self.index,
            keys: self.keys,
            index_name: self.index_name,
        }
    }
}

impl Synchronizer {
    /// Start building a synchronizer over the given stores, with the default
    /// key scheme and index name.
    pub fn builder(
        primary: Arc<dyn PrimaryStore>,
        cache: Arc<dyn Cache>,
        index: Arc<dyn SearchIndex>,
    ) -> SynchronizerBuilder {
        SynchronizerBuilder {
            primary,
            cache,
            index,
            keys: CacheKeys::default(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
        }
    }

    pub fn keys(&self) -> &CacheKeys {
        &self.keys
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    /// Read one account, cache first.
    ///
    /// A cache error or an entry that does not decode as an account counts
    /// as a miss. A cache fill failure leaves the key deleted rather than
    /// half-written.
    pub async fn get_account(&self, id: AccountId) -> Result<Synced<Fetched>> {
        let mut soft = SoftErrors::default();
        let (fetched, _) = self.read_account(id, &mut soft).await?;
        Ok(soft.finish(fetched))
    }

    /// Read every live account, served from the collection snapshot when it
    /// is cached.
    pub async fn get_all_accounts(&self) -> Result<Synced<Fetched>> {
        let key = self.keys.all();
        let mut soft = SoftErrors::default();

        if let Some((body, _)) = self.cached::<Vec<Account>>(key, &mut soft).await {
            return Ok(soft.finish(Fetched {
                body,
                source: Source::Cache,
            }));
        }

        let accounts = self.primary.scan_all().await.map_err(Error::Unavailable)?;
        let body = serde_json::to_string(&accounts)?;
        soft.absorb(
            DerivedStore::Cache,
            DerivedOp::Set,
            key,
            self.cache.set(key, &body).await,
        );

        Ok(soft.finish(Fetched {
            body,
            source: Source::Primary,
        }))
    }

    /// Insert an account, then cache it, drop the collection snapshot and
    /// index it.
    pub async fn create_account(&self, account: NewAccount) -> Result<Synced<WriteSummary>> {
        let (account, rows_affected) = self.primary.insert(account).await.map_err(Error::Store)?;

        let mut soft = SoftErrors::default();
        let body = account.to_json()?;
        let key = self.keys.account(account.id);
        soft.absorb(
            DerivedStore::Cache,
            DerivedOp::Set,
            &key,
            self.cache.set(&key, &body).await,
        );
        self.invalidate_all(&mut soft).await;
        self.index_document(account.id, &body, &mut soft).await;

        Ok(soft.finish(WriteSummary {
            id: account.id,
            rows_affected,
        }))
    }

    /// Apply `changes` to the authoritative row, then refresh the derived
    /// stores.
    ///
    /// On success the cached entry for `id` is either the new value or gone.
    pub async fn update_account(
        &self,
        id: AccountId,
        changes: AccountChanges,
    ) -> Result<Synced<WriteSummary>> {
        let mut account = self.find(id).await?;
        account.apply(changes);
        let rows_affected = self
            .primary
            .save(&mut account)
            .await
            .map_err(Error::Store)?;
        // Deleted between the lookup and the write
        if rows_affected == 0 {
            return Err(Error::NotFound(id));
        }

        let mut soft = SoftErrors::default();
        let body = account.to_json()?;
        let key = self.keys.account(account.id);
        self.refresh(&key, &body, &mut soft).await;
        self.invalidate_all(&mut soft).await;
        self.index_document(account.id, &body, &mut soft).await;

        Ok(soft.finish(WriteSummary {
            id: account.id,
            rows_affected,
        }))
    }

    /// Soft-delete an account and drop it from every derived store.
    pub async fn delete_account(&self, id: AccountId) -> Result<Synced<WriteSummary>> {
        let mut account = self.find(id).await?;
        let rows_affected = self
            .primary
            .soft_delete(&mut account)
            .await
            .map_err(Error::Store)?;
        if rows_affected == 0 {
            return Err(Error::NotFound(id));
        }

        let mut soft = SoftErrors::default();
        let key = self.keys.account(account.id);
        soft.absorb(
            DerivedStore::Cache,
            DerivedOp::Delete,
            &key,
            self.cache.delete(&key).await,
        );
        self.invalidate_all(&mut soft).await;
        soft.absorb(
            DerivedStore::SearchIndex,
            DerivedOp::Delete,
            &account.id.to_string(),
            self.index.delete(&self.index_name, account.id).await,
        );

        Ok(soft.finish(WriteSummary {
            id: account.id,
            rows_affected,
        }))
    }

    /// Free-text search over the index, hydrating each hit through
    /// [`get_account`](Self::get_account).
    ///
    /// The index is the only source here, so its failure is fatal. Hits that
    /// no longer resolve to a live account are skipped.
    pub async fn search_accounts(&self, query: &str) -> Result<Synced<Vec<Account>>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("search query is empty".into()));
        }

        let ids = self
            .index
            .search(&self.index_name, query)
            .await
            .map_err(Error::SearchUnavailable)?;

        let mut soft = SoftErrors::default();
        let mut accounts = Vec::with_capacity(ids.len());
        for id in ids {
            match self.read_account(id, &mut soft).await {
                Ok((_, account)) => accounts.push(account),
                Err(e) if e.is_not_found() => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(soft.finish(accounts))
    }

    /// Cache-aside read of one account, returning both the body served and
    /// the decoded account.
    async fn read_account(
        &self,
        id: AccountId,
        soft: &mut SoftErrors,
    ) -> Result<(Fetched, Account)> {
        let key = self.keys.account(id);
        if let Some((body, account)) = self.cached::<Account>(&key, soft).await {
            let fetched = Fetched {
                body,
                source: Source::Cache,
            };
            return Ok((fetched, account));
        }

        let account = self.find(id).await?;
        let body = account.to_json()?;
        self.refresh(&key, &body, soft).await;

        let fetched = Fetched {
            body,
            source: Source::Primary,
        };
        Ok((fetched, account))
    }

    /// Cached body under `key` along with its decoded value. An entry that
    /// fails to decode is reported and treated as absent.
    async fn cached<T: DeserializeOwned>(
        &self,
        key: &str,
        soft: &mut SoftErrors,
    ) -> Option<(String, T)> {
        let body = soft
            .absorb(
                DerivedStore::Cache,
                DerivedOp::Get,
                key,
                self.cache.get(key).await,
            )
            .flatten()?;

        let decoded = serde_json::from_str(&body)
            .map_err(|e| StoreError::Corrupt(e.to_string()));
        soft.absorb(DerivedStore::Cache, DerivedOp::Get, key, decoded)
            .map(|value| (body, value))
    }

    /// Authoritative lookup, bypassing the cache.
    async fn find(&self, id: AccountId) -> Result<Account> {
        match self.primary.find_by_id(id).await {
            Ok(Some(account)) => Ok(account),
            Ok(None) => Err(Error::NotFound(id)),
            Err(source) => Err(Error::Lookup { id, source }),
        }
    }

    /// Write `body` under `key`, deleting the key if the write fails.
    async fn refresh(&self, key: &str, body: &str, soft: &mut SoftErrors) {
        let written = soft.absorb(
            DerivedStore::Cache,
            DerivedOp::Set,
            key,
            self.cache.set(key, body).await,
        );
        if written.is_none() {
            soft.absorb(
                DerivedStore::Cache,
                DerivedOp::Delete,
                key,
                self.cache.delete(key).await,
            );
        }
    }

    async fn invalidate_all(&self, soft: &mut SoftErrors) {
        let key = self.keys.all();
        soft.absorb(
            DerivedStore::Cache,
            DerivedOp::Delete,
            key,
            self.cache.delete(key).await,
        );
    }

    async fn index_document(&self, id: AccountId, body: &str, soft: &mut SoftErrors) {
        soft.absorb(
            DerivedStore::SearchIndex,
            DerivedOp::Upsert,
            &id.to_string(),
            self.index.upsert(&self.index_name, id, body).await,
        );
    }
}
