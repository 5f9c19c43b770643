//! # Finance Engine
//!
//! The synchronization core of the finance accounts service.
//!
//! Accounts live in a relational **primary store** (the source of truth) and
//! are projected into a key-value **cache** and a **search index**. This crate
//! decides, for every CRUD verb, in which order those three stores are touched
//! and which failures are allowed to fail the call.
//!
//! ## Design Principles
//!
//! - **No IO of its own**: stores are consumed through the traits in
//!   [`store`]; the server crate injects concrete clients at startup
//! - **Primary store wins**: cache and index entries are derived projections
//!   and never override a primary store read
//! - **Failure isolation**: cache and index failures are returned as typed
//!   [`SoftError`]s next to the successful value instead of failing the call
//! - **No logging**: callers decide what to do with soft errors
//!
//! ## Consistency policy
//!
//! | Operation | Primary store | Single-record key | Collection key | Search index |
//! |-----------|---------------|-------------------|----------------|--------------|
//! | get       | read on miss  | read, fill on miss | -             | -            |
//! | get all   | scan on miss  | -                 | read, fill on miss | -        |
//! | create    | insert        | set               | delete         | upsert       |
//! | update    | find + save   | set (delete on failure) | delete   | upsert       |
//! | delete    | find + soft delete | delete       | delete         | delete       |
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use finance_engine::{
//!     AccountChanges, MemoryCache, MemoryPrimaryStore, MemorySearchIndex, NewAccount,
//!     Synchronizer,
//! };
//!
//! # tokio_test_runtime(async {
//! let sync = Synchronizer::builder(
//!     Arc::new(MemoryPrimaryStore::new()),
//!     Arc::new(MemoryCache::new()),
//!     Arc::new(MemorySearchIndex::new()),
//! )
//! .build();
//!
//! let created = sync.create_account(NewAccount::new("Alice", 100.0)).await.unwrap();
//! assert_eq!(created.value.id, 1);
//!
//! let updated = sync
//!     .update_account(1, AccountChanges::new("Alice Smith", 150.0))
//!     .await
//!     .unwrap();
//! assert_eq!(updated.value.rows_affected, 1);
//!
//! let account = sync.get_account(1).await.unwrap().value.account().unwrap();
//! assert_eq!(account.name, "Alice Smith");
//! # });
//! # fn tokio_test_runtime<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(f)
//! # }
//! ```

pub mod account;
pub mod error;
pub mod keys;
pub mod memory;
pub mod store;
pub mod sync;

// Re-export main types at crate root
pub use account::{Account, AccountChanges, NewAccount, WriteSummary};
pub use error::{DerivedOp, DerivedStore, Error, Result, SoftError, StoreError};
pub use keys::{CacheKeys, DEFAULT_ALL_KEY, DEFAULT_KEY_PREFIX};
pub use memory::{MemoryCache, MemoryPrimaryStore, MemorySearchIndex};
pub use store::{Cache, PrimaryStore, SearchIndex};
pub use sync::{Fetched, Source, Synced, Synchronizer, SynchronizerBuilder, DEFAULT_INDEX_NAME};

/// Type aliases for clarity
pub type AccountId = u64;
pub type RowsAffected = u64;
