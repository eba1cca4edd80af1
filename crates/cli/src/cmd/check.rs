//! Implementation of the `vercheck check` command.
//!
//! Runs one check of an agent instance: fetches the manifest, diffs it against
//! the persisted one, appends new events to the instance's event log and saves
//! the state.

use std::time::Instant;

use anyhow::{Context, Result};
use tracing::warn;

use vercheck_lib::agent::{Agent, CheckReport};
use vercheck_lib::event::EventLog;
use vercheck_lib::lock::InstanceLock;

use crate::args::ConfigArgs;
use crate::output::{
  OutputFormat, format_duration, print_event, print_info, print_json, print_stat, print_success, print_warning,
};

/// Execute the check command.
///
/// Holds the instance lock for the whole run. A failed run is recorded in the
/// instance state so `vercheck status` can report it.
///
/// # Arguments
///
/// * `args` - Config file and flag overrides for the instance
/// * `dry_run` - If true, compute events without delivering them or saving state
/// * `output` - Text or JSON output
pub fn cmd_check(args: &ConfigArgs, dry_run: bool, output: OutputFormat) -> Result<()> {
  let start = Instant::now();
  let config = args.load()?;

  let _lock = InstanceLock::acquire(&config.name, "check").context("Failed to acquire instance lock")?;
  let agent = Agent::new(config).context("Failed to create agent")?;

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = if dry_run {
    rt.block_on(agent.dry_run())
  } else {
    let mut log = EventLog::for_instance(&agent.config().name).context("Failed to open event log")?;
    rt.block_on(agent.check(&mut log))
  };

  let report = match result {
    Ok(report) => report,
    Err(err) => {
      if !dry_run && let Err(record_err) = agent.record_failure(&err) {
        warn!(error = %record_err, "failed to record check failure");
      }
      return Err(err).context("Check failed");
    }
  };

  if output.is_json() {
    print_json(&report)?;
  } else {
    print_report(&report, &agent)?;
    print_stat("Duration", &format_duration(start.elapsed()));
  }

  Ok(())
}

fn print_report(report: &CheckReport, agent: &Agent) -> Result<()> {
  for event in &report.events {
    print_event(&event.payload())?;
  }

  if report.dry_run {
    print_info("Dry run - nothing delivered or saved");
  } else if report.events.is_empty() {
    print_info(&format!("No new releases for {}", agent.config().selector));
  } else if report.delivered == 0 {
    print_warning("Event emission disabled - events not delivered");
  } else {
    print_success(&format!("Delivered {} event(s)", report.delivered));
  }

  if report.state_replaced {
    print_stat("State", "manifest updated");
  }

  Ok(())
}
