mod args;
mod cmd;
mod output;

use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use args::ConfigArgs;
use output::OutputFormat;
use vercheck_lib::consts::DEFAULT_SCHEDULE;

/// vercheck - watch a published version manifest and report new releases
#[derive(Parser)]
#[command(name = "vercheck")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Print machine-readable JSON instead of text
  #[arg(long, global = true)]
  json: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Fetch the manifest once and report what changed
  Check {
    #[command(flatten)]
    config: ConfigArgs,

    /// Compute events without delivering them or saving state
    #[arg(long)]
    dry_run: bool,
  },

  /// Check on a fixed schedule until interrupted
  Watch {
    #[command(flatten)]
    config: ConfigArgs,

    /// Time between checks (e.g. 30m, 1h, 2h 30m)
    #[arg(long, default_value = DEFAULT_SCHEDULE, value_parser = humantime::parse_duration)]
    every: Duration,
  },

  /// Show persisted state and health of an instance
  Status {
    #[command(flatten)]
    config: ConfigArgs,
  },

  /// Validate configuration without fetching anything
  Validate {
    #[command(flatten)]
    config: ConfigArgs,
  },

  /// Show platform and supported option values
  Info,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let filter = if cli.verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let output = if cli.json {
    OutputFormat::Json
  } else {
    OutputFormat::Text
  };

  match cli.command {
    Commands::Check { config, dry_run } => cmd::cmd_check(&config, dry_run, output),
    Commands::Watch { config, every } => cmd::cmd_watch(&config, every, output),
    Commands::Status { config } => cmd::cmd_status(&config, cli.verbose, output),
    Commands::Validate { config } => cmd::cmd_validate(&config, output),
    Commands::Info => cmd::cmd_info(output),
  }
}
