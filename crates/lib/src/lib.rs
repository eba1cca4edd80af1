//! vercheck-lib: Core types and logic for vercheck
//!
//! This crate watches a published version manifest and reports new releases:
//! - `Manifest`: the os → arch → record document served at `/versions/<type>.json`
//! - `compute_diff`: decides which events a check emits and what gets persisted
//! - `Agent`: one configured instance tying fetch, diff, events and state together
//! - `AgentState`: what survives between checks, plus the health timestamps

pub mod agent;
pub mod config;
pub mod consts;
pub mod diff;
pub mod event;
pub mod fetch;
pub mod health;
pub mod lock;
pub mod manifest;
pub mod platform;
pub mod state;
pub mod util;
