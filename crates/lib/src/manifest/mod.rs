//! Version manifest types and parsing.
//!
//! A manifest is fetched fresh on every check and compared against the one
//! persisted by the previous check.

mod types;

pub use types::*;
