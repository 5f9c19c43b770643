//! Request handlers for account operations.

mod accounts;

pub use accounts::*;
