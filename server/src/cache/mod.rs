//! Cache backends.

mod redis;

pub use self::redis::*;
