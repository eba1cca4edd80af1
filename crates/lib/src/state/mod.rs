//! Persisted per-instance state.
//!
//! The state holds the manifest the next check diffs against, plus the
//! timestamps the health check reads.

mod storage;
mod types;

pub use storage::StateStore;
pub use types::{AgentState, StateError};
