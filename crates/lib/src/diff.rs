//! Change detection between a freshly fetched manifest and the last one seen.
//!
//! This module decides, for one check, which events to emit and whether the
//! persisted manifest must be replaced. It does no I/O.
//!
//! # Always mode
//!
//! The whole current manifest is reported on every check. The persisted
//! manifest is replaced only when it differs from the current one.
//!
//! # Changes-only mode
//!
//! - Identical manifests: nothing is emitted and nothing is persisted.
//! - No prior state (never checked, or the last manifest was empty): every
//!   entry listed under the selected `(os, arch)` is emitted.
//! - Prior state: an entry is emitted when it is listed under the selected
//!   `(os, arch)` and the previous manifest did not list the identical
//!   `(os, arch, record)` triple.
//!
//! In both branches the current manifest replaces the persisted one, even if
//! no entry matched the selector.

use crate::config::Selector;
use crate::event::{EmittedEvent, ReleaseEvent};
use crate::manifest::Manifest;

/// Which checks produce events.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiffMode {
  /// Emit the selected record only when it changed.
  #[default]
  ChangesOnly,
  /// Emit the full manifest on every check.
  Always,
}

/// What the persisted manifest should become after a check.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum StateUpdate {
  /// Leave the persisted manifest as it is.
  #[default]
  Unchanged,
  /// Persist this manifest in place of the previous one.
  Replace(Manifest),
}

/// How a single current entry was judged in changes-only mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDecision {
  pub os: String,
  pub arch: String,
  /// The previous manifest listed the identical `(os, arch, record)` triple.
  pub found: bool,
  /// The entry sits at the selected `(os, arch)`.
  pub selected: bool,
}

impl EntryDecision {
  pub fn emits(&self) -> bool {
    self.selected && !self.found
  }
}

/// Result of comparing two manifests.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffOutcome {
  pub events: Vec<EmittedEvent>,
  pub state: StateUpdate,
  /// One entry per current manifest entry when a changes-only diff ran.
  pub decisions: Vec<EntryDecision>,
}

impl DiffOutcome {
  /// Returns true if the check neither emits nor persists anything.
  pub fn is_empty(&self) -> bool {
    self.events.is_empty() && self.state == StateUpdate::Unchanged
  }
}

/// Prior state as seen by the diff.
///
/// An absent manifest and an empty one both mean nothing meaningful was
/// recorded before.
#[derive(Debug, Clone, Copy)]
enum PriorState<'a> {
  Empty,
  Seen(&'a Manifest),
}

impl<'a> From<Option<&'a Manifest>> for PriorState<'a> {
  fn from(previous: Option<&'a Manifest>) -> Self {
    match previous {
      Some(manifest) if !manifest.is_empty() => PriorState::Seen(manifest),
      _ => PriorState::Empty,
    }
  }
}

/// Compare `current` against the last persisted manifest.
///
/// # Arguments
///
/// * `current` - The manifest fetched by this check (may be empty)
/// * `previous` - The persisted manifest (None if never checked)
/// * `selector` - The `(type, os, arch)` this instance reports on
/// * `mode` - Whether to report changes only or every check
pub fn compute_diff(current: &Manifest, previous: Option<&Manifest>, selector: &Selector, mode: DiffMode) -> DiffOutcome {
  let changed = previous != Some(current);
  let state = if changed {
    StateUpdate::Replace(current.clone())
  } else {
    StateUpdate::Unchanged
  };

  match mode {
    DiffMode::Always => DiffOutcome {
      events: vec![EmittedEvent::Manifest(current.clone())],
      state,
      decisions: Vec::new(),
    },
    DiffMode::ChangesOnly if !changed => DiffOutcome::default(),
    DiffMode::ChangesOnly => {
      let prior = PriorState::from(previous);
      let mut events = Vec::new();
      let mut decisions = Vec::with_capacity(current.len());

      for (os, arch, record) in current.entries() {
        // Manifest keys are unique, so an identical triple can only be listed
        // under the same (os, arch) key in the previous manifest.
        let found = match prior {
          PriorState::Empty => false,
          PriorState::Seen(previous) => previous.contains_entry(os, arch, record),
        };
        let decision = EntryDecision {
          os: os.to_string(),
          arch: arch.to_string(),
          found,
          selected: selector.matches(os, arch),
        };

        if decision.emits() {
          events.push(EmittedEvent::Release(ReleaseEvent::annotate(
            record,
            selector.kind,
            os,
            arch,
          )));
        }
        decisions.push(decision);
      }

      DiffOutcome {
        events,
        state,
        decisions,
      }
    }
  }
}
