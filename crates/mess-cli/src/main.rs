//! # mess CLI entry point
//!
//! Parses command-line arguments, initializes logging, loads the policy
//! configuration and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mess_cli::config::load_policy_config;
use mess_cli::curve::{run_curve, CurveArgs};
use mess_cli::simulate::{run_simulate, SimulateArgs};
use mess_cli::sweep::{run_sweep, SweepArgs};

/// MESS artificial-finality reorg gate toolkit.
///
/// Tabulates penalty curves and runs fork simulations against the
/// antigravity insertion gate on synthetic chains.
#[derive(Parser, Debug)]
#[command(name = "mess", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    /// Path to a YAML or JSON policy configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Tabulate a penalty curve.
    Curve(CurveArgs),

    /// Insert a competing branch against a synthetic canonical chain.
    Simulate(SimulateArgs),

    /// Accept/reject/side grid over fork depth and branch time offset.
    Sweep(SweepArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let config = match load_policy_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{e:#}");
            return ExitCode::from(1);
        }
    };

    let result = match &cli.command {
        Commands::Curve(args) => run_curve(args, &config),
        Commands::Simulate(args) => run_simulate(args, &config),
        Commands::Sweep(args) => run_sweep(args, &config),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
