//! # Curve Subcommand
//!
//! Tabulates a penalty curve over a range of elapsed seconds.

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use mess_policy::{PenaltyCurve, PolicyConfig};

use crate::config::CurveArg;

/// Arguments for `mess curve`.
#[derive(Args, Debug)]
pub struct CurveArgs {
    /// Curve to tabulate. Defaults to the configured curve.
    #[arg(long, value_enum)]
    pub curve: Option<CurveArg>,

    /// First elapsed time, in seconds.
    #[arg(long, default_value_t = 0)]
    pub from: u64,

    /// Last elapsed time, in seconds (inclusive).
    #[arg(long, default_value_t = 28_800)]
    pub to: u64,

    /// Step between rows, in seconds.
    #[arg(long, default_value_t = 1_800)]
    pub step: u64,

    /// Emit JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// One tabulated point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurveRow {
    /// Elapsed seconds.
    pub elapsed: u64,
    /// Required ratio numerator.
    pub numerator: u64,
    /// Required ratio denominator.
    pub denominator: u64,
    /// Display ratio.
    pub ratio: f64,
}

/// Evaluate `curve` at `from, from + step, ...` up to and including `to`.
pub fn tabulate(curve: PenaltyCurve, from: u64, to: u64, step: u64) -> Result<Vec<CurveRow>> {
    if step == 0 {
        bail!("--step must be positive");
    }
    if from > to {
        bail!("--from ({from}) is after --to ({to})");
    }
    let rows = (from..=to)
        .step_by(usize::try_from(step)?)
        .map(|elapsed| {
            let value = curve.evaluate(elapsed);
            CurveRow {
                elapsed,
                numerator: value.numerator,
                denominator: value.denominator,
                ratio: value.as_f64(),
            }
        })
        .collect();
    Ok(rows)
}

/// Run `mess curve`.
pub fn run_curve(args: &CurveArgs, config: &PolicyConfig) -> Result<u8> {
    let curve = args.curve.map(PenaltyCurve::from).unwrap_or(config.curve);
    let rows = tabulate(curve, args.from, args.to, args.step)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(0);
    }

    println!("curve: {curve}");
    println!("{:>10}  {:>12}  {:>8}", "elapsed", "required", "ratio");
    for row in &rows {
        println!(
            "{:>9}s  {:>12}  {:>8.4}",
            row.elapsed,
            format!("{}/{}", row.numerator, row.denominator),
            row.ratio
        );
    }
    Ok(0)
}
