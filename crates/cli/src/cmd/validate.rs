//! Implementation of the `vercheck validate` command.

use anyhow::Result;
use serde_json::json;

use vercheck_lib::diff::DiffMode;

use crate::args::ConfigArgs;
use crate::output::{OutputFormat, print_json, print_stat, print_success};

/// Validate configuration without touching the network or any state.
pub fn cmd_validate(args: &ConfigArgs, output: OutputFormat) -> Result<()> {
  let config = args.load()?;
  let source = args
    .config_path()
    .map(|path| dunce::canonicalize(&path).unwrap_or(path));
  let changes_only = config.mode == DiffMode::ChangesOnly;

  if output.is_json() {
    return print_json(&json!({
      "valid": true,
      "config_file": source,
      "name": config.name,
      "selector": config.selector,
      "changes_only": changes_only,
      "emit_events": config.emit_events,
      "debug": config.debug,
      "expected_receive_period_in_days": config.expected_receive_period_in_days,
      "url": config.manifest_url(),
      "request_timeout_secs": config.request_timeout.as_secs(),
    }));
  }

  print_success("Configuration is valid");
  if let Some(path) = &source {
    print_stat("Config file", &path.display().to_string());
  }
  print_stat("Instance", &config.name);
  print_stat("Watching", &config.selector.to_string());
  print_stat("URL", &config.manifest_url());
  print_stat("Changes only", &changes_only.to_string());
  print_stat("Emit events", &config.emit_events.to_string());
  print_stat(
    "Expected period",
    &format!("{} day(s)", config.expected_receive_period_in_days),
  );

  Ok(())
}
