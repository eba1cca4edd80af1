//! Status command implementation.
//!
//! Displays the persisted state of an agent instance and its health verdict.

use anyhow::{Context, Result};
use serde::Serialize;

use vercheck_lib::agent::Agent;
use vercheck_lib::diff::DiffMode;
use vercheck_lib::event::{EventLog, EventRecord};
use vercheck_lib::util::unix_now;

use crate::args::ConfigArgs;
use crate::output::{
  OutputFormat, format_ago, print_error, print_event, print_info, print_json, print_stat, print_success,
};

#[derive(Serialize)]
struct StatusReport<'a> {
  instance: &'a str,
  working: bool,
  health: String,
  last_check_at: Option<u64>,
  last_event_at: Option<u64>,
  last_error_at: Option<u64>,
  last_error: Option<&'a str>,
  manifest_entries: usize,
  last_event: Option<&'a EventRecord>,
}

pub fn cmd_status(args: &ConfigArgs, verbose: bool, output: OutputFormat) -> Result<()> {
  let config = args.load()?;
  let agent = Agent::new(config).context("Failed to create agent")?;
  let name = &agent.config().name;

  let state = agent.store().load().context("Failed to load instance state")?;
  let now = unix_now();
  let health = agent.health(now).context("Failed to load instance state")?;
  let last_event = EventLog::for_instance(name)
    .and_then(|log| log.last())
    .context("Failed to read event log")?;
  let manifest_entries = state.last_manifest.as_ref().map_or(0, |m| m.len());

  if output.is_json() {
    return print_json(&StatusReport {
      instance: name,
      working: health.is_working(),
      health: health.to_string(),
      last_check_at: state.last_check_at,
      last_event_at: state.last_event_at,
      last_error_at: state.last_error_at,
      last_error: state.last_error.as_deref(),
      manifest_entries,
      last_event: last_event.as_ref(),
    });
  }

  if state.last_check_at.is_none() && state.last_error_at.is_none() {
    print_info(&format!("Instance '{}' has not been checked yet. Run 'vercheck check'.", name));
    return Ok(());
  }

  if health.is_working() {
    print_success(&format!("Instance '{}' is working", name));
  } else {
    print_error(&format!("Instance '{}' is not working: {}", name, health));
  }

  let mode = match agent.config().mode {
    DiffMode::ChangesOnly => "changes only",
    DiffMode::Always => "always",
  };
  print_stat("Watching", &agent.config().selector.to_string());
  print_stat("Mode", mode);
  print_stat("Last check", &format_ago(state.last_check_at, now));
  print_stat("Last event", &format_ago(state.last_event_at, now));
  if let Some(error) = &state.last_error {
    print_stat(
      "Last error",
      &format!("{} ({})", error, format_ago(state.last_error_at, now)),
    );
  }
  print_stat("Manifest entries", &manifest_entries.to_string());

  if verbose {
    print_stat("State file", &agent.store().path().display().to_string());
    if let Some(record) = &last_event {
      println!();
      println!("Last event:");
      print_event(&record.payload)?;
    }
  }

  Ok(())
}
