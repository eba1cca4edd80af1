//! One check of an agent instance: fetch, parse, diff, then emit and persist.
//!
//! A check either completes (events delivered, state saved) or fails before
//! touching the persisted manifest. Fetch and parse failures never reach the
//! diff.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::AgentConfig;
use crate::diff::{DiffOutcome, StateUpdate, compute_diff};
use crate::event::{EmittedEvent, EventError, EventSink};
use crate::fetch::{FetchError, ManifestFetcher};
use crate::health::{Health, check_health};
use crate::manifest::{Manifest, ParseError};
use crate::state::{AgentState, StateError, StateStore};
use crate::util::unix_now;

#[derive(Debug, Error)]
pub enum AgentError {
  #[error(transparent)]
  Fetch(#[from] FetchError),

  #[error(transparent)]
  Parse(#[from] ParseError),

  #[error(transparent)]
  State(#[from] StateError),

  #[error(transparent)]
  Event(#[from] EventError),
}

/// What a check did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
  /// Events the diff produced, whether or not they were delivered.
  pub events: Vec<EmittedEvent>,
  /// Number of events handed to the sink.
  pub delivered: usize,
  /// The persisted manifest was (or, for a dry run, would be) replaced.
  pub state_replaced: bool,
  pub dry_run: bool,
}

/// A configured agent instance.
pub struct Agent {
  config: AgentConfig,
  fetcher: ManifestFetcher,
  store: StateStore,
}

impl Agent {
  /// Create an agent that persists to the default state location.
  pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
    let store = StateStore::for_instance(&config.name)?;
    Self::with_store(config, store)
  }

  pub fn with_store(config: AgentConfig, store: StateStore) -> Result<Self, AgentError> {
    let fetcher = ManifestFetcher::new(config.request_timeout)?;
    Ok(Self { config, fetcher, store })
  }

  pub fn config(&self) -> &AgentConfig {
    &self.config
  }

  pub fn store(&self) -> &StateStore {
    &self.store
  }

  /// Run one check, delivering events to `sink` and persisting the result.
  ///
  /// # Errors
  ///
  /// Returns an error if the manifest cannot be fetched or parsed, or if the
  /// state or an event cannot be written.
  pub async fn check(&self, sink: &mut dyn EventSink) -> Result<CheckReport, AgentError> {
    let mut state = self.store.load()?;
    let outcome = self.evaluate(&state).await?;

    let mut delivered = 0;
    if self.config.emit_events {
      for event in &outcome.events {
        sink.emit(event)?;
        delivered += 1;
      }
    } else if !outcome.events.is_empty() {
      info!(count = outcome.events.len(), "event emission disabled, dropping events");
    }
    if delivered > 0 {
      info!(count = delivered, "created events");
    }

    let now = unix_now();
    let state_replaced = matches!(outcome.state, StateUpdate::Replace(_));
    state.last_check_at = Some(now);
    if delivered > 0 {
      state.last_event_at = Some(now);
    }
    state.apply(outcome.state);
    self.store.save(&state)?;

    Ok(CheckReport {
      events: outcome.events,
      delivered,
      state_replaced,
      dry_run: false,
    })
  }

  /// Run a check without delivering events or persisting anything.
  pub async fn dry_run(&self) -> Result<CheckReport, AgentError> {
    let state = self.store.load()?;
    let outcome = self.evaluate(&state).await?;

    Ok(CheckReport {
      state_replaced: matches!(outcome.state, StateUpdate::Replace(_)),
      events: outcome.events,
      delivered: 0,
      dry_run: true,
    })
  }

  /// Record a failed check so the health check can see it.
  pub fn record_failure(&self, error: &AgentError) -> Result<(), StateError> {
    self.store.record_error(&error.to_string())
  }

  /// Health of this instance as of `now`.
  pub fn health(&self, now: u64) -> Result<Health, StateError> {
    let state = self.store.load()?;
    Ok(check_health(&state, self.config.expected_receive_period_in_days, now))
  }

  async fn evaluate(&self, state: &AgentState) -> Result<DiffOutcome, AgentError> {
    let url = self.config.manifest_url();
    let body = self.fetcher.fetch(&url).await?;

    if self.config.debug {
      info!(body = %String::from_utf8_lossy(&body), "response body");
    }

    let current = Manifest::parse(&body)?;
    let outcome = compute_diff(
      &current,
      state.last_manifest.as_ref(),
      &self.config.selector,
      self.config.mode,
    );

    if self.config.debug {
      for decision in &outcome.decisions {
        info!(
          os = %decision.os,
          arch = %decision.arch,
          found = decision.found,
          selected = decision.selected,
          "found is {}{}",
          decision.found,
          if decision.emits() { ", event created" } else { ", nothing created" }
        );
      }
    }
    debug!(
      events = outcome.events.len(),
      replace = matches!(outcome.state, StateUpdate::Replace(_)),
      "diff complete"
    );

    Ok(outcome)
  }
}
