//! Search index backends.

mod opensearch;

pub use opensearch::*;
