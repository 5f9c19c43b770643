//! PostgreSQL persistence for the account primary store.

mod accounts;
mod pool;

pub use accounts::*;
pub use pool::*;
