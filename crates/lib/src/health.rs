//! Whether an agent instance is still doing its job.
//!
//! An instance is healthy when it delivered an event within its expected
//! receive period and has not failed since.

use std::fmt;

use crate::consts::{RECENT_ERROR_GRACE_SECS, SECS_PER_DAY};
use crate::state::AgentState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Health {
  Working,
  /// No event was ever delivered.
  NoEvents,
  /// The last event is older than the expected receive period.
  Stale { last_event_at: u64 },
  /// A check failed after (or shortly before) the last event.
  RecentError { at: u64, message: Option<String> },
}

impl Health {
  pub fn is_working(&self) -> bool {
    matches!(self, Health::Working)
  }
}

impl fmt::Display for Health {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Health::Working => write!(f, "working"),
      Health::NoEvents => write!(f, "no event delivered yet"),
      Health::Stale { last_event_at } => write!(f, "no event since unix time {}", last_event_at),
      Health::RecentError { at, message: Some(message) } => write!(f, "check failed at unix time {}: {}", at, message),
      Health::RecentError { at, message: None } => write!(f, "check failed at unix time {}", at),
    }
  }
}

/// Judge an instance from its persisted state.
///
/// A recent error wins over staleness: it is the more actionable report.
pub fn check_health(state: &AgentState, expected_receive_period_in_days: u64, now: u64) -> Health {
  let Some(last_event_at) = state.last_event_at else {
    return Health::NoEvents;
  };

  if let Some(at) = state.last_error_at
    && at > last_event_at.saturating_sub(RECENT_ERROR_GRACE_SECS)
  {
    return Health::RecentError {
      at,
      message: state.last_error.clone(),
    };
  }

  if now.saturating_sub(last_event_at) > expected_receive_period_in_days.saturating_mul(SECS_PER_DAY) {
    return Health::Stale { last_event_at };
  }

  Health::Working
}

#[cfg(test)]
mod tests {
  use super::*;

  const NOW: u64 = 1_700_000_000;

  fn state(last_event_at: Option<u64>, last_error_at: Option<u64>) -> AgentState {
    AgentState {
      last_event_at,
      last_error_at,
      last_error: last_error_at.map(|_| "boom".to_string()),
      ..Default::default()
    }
  }

  #[test]
  fn fresh_event_is_working() {
    let health = check_health(&state(Some(NOW - 3600), None), 2, NOW);
    assert_eq!(health, Health::Working);
    assert!(health.is_working());
  }

  #[test]
  fn never_emitted_is_not_working() {
    assert_eq!(check_health(&state(None, None), 2, NOW), Health::NoEvents);
  }

  #[test]
  fn event_older_than_period_is_stale() {
    let last = NOW - 3 * SECS_PER_DAY;
    assert_eq!(
      check_health(&state(Some(last), None), 2, NOW),
      Health::Stale { last_event_at: last }
    );
    assert!(check_health(&state(Some(last), None), 3, NOW).is_working());
  }

  #[test]
  fn error_after_event_is_not_working() {
    let health = check_health(&state(Some(NOW - 3600), Some(NOW - 60)), 2, NOW);
    assert_eq!(
      health,
      Health::RecentError {
        at: NOW - 60,
        message: Some("boom".to_string())
      }
    );
  }

  #[test]
  fn error_just_before_event_still_counts() {
    let event = NOW - 3600;
    let health = check_health(&state(Some(event), Some(event - 60)), 2, NOW);
    assert!(matches!(health, Health::RecentError { .. }));
  }

  #[test]
  fn old_error_is_forgiven() {
    let event = NOW - 3600;
    let health = check_health(&state(Some(event), Some(event - 600)), 2, NOW);
    assert_eq!(health, Health::Working);
  }
}
