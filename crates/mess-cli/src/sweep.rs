//! # Sweep Subcommand
//!
//! Maps the gate's behavior over a grid of fork depths and branch time
//! offsets. Each cell forks a fresh canonical chain `depth` blocks below its
//! head with a branch of `depth + extra` blocks, and records the verdict:
//!
//! ```text
//! A  accept    R  reject    S  side    E  error
//! ```

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use mess_policy::{PolicyConfig, Verdict};

use crate::config::PolicyOverrides;
use crate::simulate::{simulate, ForkShape};

/// Arguments for `mess sweep`.
#[derive(Args, Debug)]
pub struct SweepArgs {
    /// Canonical chain length above genesis.
    #[arg(long, default_value_t = 1000)]
    pub canonical_len: usize,

    /// Fork depths below the canonical head, comma separated.
    #[arg(long, value_delimiter = ',', default_values_t = vec![1, 25, 50, 100, 200, 300, 500, 750, 999])]
    pub depths: Vec<usize>,

    /// Blocks the branch adds beyond the fork depth.
    #[arg(long, default_value_t = 0)]
    pub extra: usize,

    /// Smallest branch time offset.
    #[arg(long, default_value_t = -9, allow_hyphen_values = true)]
    pub min_offset: i64,

    /// Largest branch time offset.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub max_offset: i64,

    /// Emit JSON instead of a grid.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub policy: PolicyOverrides,
}

/// One grid cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    /// Fork depth below the canonical head.
    pub depth: usize,
    /// Branch time offset.
    pub offset: i64,
    /// Verdict, or `None` on error.
    pub verdict: Option<Verdict>,
}

impl Cell {
    /// Single-character grid symbol.
    pub fn symbol(&self) -> char {
        match self.verdict {
            Some(Verdict::Accept) => 'A',
            Some(Verdict::Reject) => 'R',
            Some(Verdict::Side) => 'S',
            None => 'E',
        }
    }
}

/// Evaluate every (depth, offset) pair.
pub fn sweep(
    canonical_len: usize,
    depths: &[usize],
    extra: usize,
    offsets: std::ops::RangeInclusive<i64>,
    config: &PolicyConfig,
) -> Result<Vec<Cell>> {
    if offsets.is_empty() {
        bail!("offset range is empty");
    }
    if let Some(bad) = depths.iter().find(|d| **d == 0 || **d > canonical_len) {
        bail!("depth {bad} must be between 1 and the canonical length {canonical_len}");
    }

    let mut cells = Vec::with_capacity(depths.len() * offsets.clone().count());
    for &depth in depths {
        for offset in offsets.clone() {
            let shape = ForkShape {
                canonical_len,
                canonical_offset: 0,
                ancestor: (canonical_len - depth) as u64,
                branch_len: depth + extra,
                branch_offset: offset,
            };
            let sim = simulate(shape, config.clone(), 0, 1)?;
            let verdict = sim.attempts.first().and_then(|a| a.verdict);
            tracing::debug!(depth, offset, ?verdict, "sweep cell");
            cells.push(Cell {
                depth,
                offset,
                verdict,
            });
        }
    }
    Ok(cells)
}

/// Run `mess sweep`.
pub fn run_sweep(args: &SweepArgs, base: &PolicyConfig) -> Result<u8> {
    let config = args.policy.apply(base)?;
    let offsets = args.min_offset..=args.max_offset;
    let cells = sweep(args.canonical_len, &args.depths, args.extra, offsets.clone(), &config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&cells)?);
        return Ok(0);
    }

    println!(
        "canonical length {}, curve {}, policy {}",
        args.canonical_len,
        config.curve,
        if config.enabled { "enabled" } else { "disabled" }
    );
    print!("{:>8} |", "depth");
    for offset in offsets.clone() {
        print!("{offset:>4}");
    }
    println!();
    let width = offsets.count();
    for row in cells.chunks(width) {
        print!("{:>8} |", row[0].depth);
        for cell in row {
            print!("{:>4}", cell.symbol());
        }
        println!();
    }
    Ok(0)
}
