//! Implementation of the `vercheck watch` command.
//!
//! Runs `check` on a fixed schedule until interrupted. A failed run is logged
//! and recorded, and the next run goes ahead as scheduled.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use vercheck_lib::agent::Agent;
use vercheck_lib::event::EventLog;
use vercheck_lib::lock::InstanceLock;

use crate::args::ConfigArgs;
use crate::output::{OutputFormat, print_error, print_event, print_json};

pub fn cmd_watch(args: &ConfigArgs, every: Duration, output: OutputFormat) -> Result<()> {
  if every.is_zero() {
    anyhow::bail!("--every must be greater than zero");
  }
  let config = args.load()?;

  let _lock = InstanceLock::acquire(&config.name, "watch").context("Failed to acquire instance lock")?;
  let agent = Agent::new(config).context("Failed to create agent")?;
  let mut log = EventLog::for_instance(&agent.config().name).context("Failed to open event log")?;

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  rt.block_on(async {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!(
      instance = %agent.config().name,
      every = %humantime::format_duration(every),
      "watching"
    );

    loop {
      tokio::select! {
        _ = interval.tick() => run_once(&agent, &mut log, output).await,
        _ = &mut shutdown => {
          info!("interrupted, stopping");
          break;
        }
      }
    }
  });

  Ok(())
}

async fn run_once(agent: &Agent, log: &mut EventLog, output: OutputFormat) {
  match agent.check(log).await {
    Ok(report) => {
      let printed = if output.is_json() {
        print_json(&report)
      } else {
        report.events.iter().try_for_each(|event| print_event(&event.payload()))
      };
      if let Err(err) = printed {
        warn!(error = %err, "failed to print check result");
      }
    }
    Err(err) => {
      error!(error = %err, "check failed");
      print_error(&format!("Check failed: {}", err));
      if let Err(record_err) = agent.record_failure(&err) {
        warn!(error = %record_err, "failed to record check failure");
      }
    }
  }
}
