//! # Simulate Subcommand
//!
//! Builds a canonical chain on genesis and a competing branch off one of its
//! blocks, inserts the branch through the gate, and reports what happened.
//! With `--reinsert` the branch is submitted a second time so the
//! known-block path can be observed as well.

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use mess_chain::{genesis, BlockChain, InsertError, InsertPath, InsertionGate, MemoryStore, SegmentBuilder};
use mess_core::{BlockHash, Header};
use mess_policy::{PolicyConfig, RejectionReport, Verdict};

use crate::config::PolicyOverrides;

/// Arguments for `mess simulate`.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Canonical chain length above genesis.
    #[arg(long, default_value_t = 1000)]
    pub canonical_len: usize,

    /// Canonical per-block offset from the 10-second spacing.
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    pub canonical_offset: i64,

    /// Number of the canonical block the branch forks from.
    #[arg(long)]
    pub ancestor: u64,

    /// Branch length above the ancestor.
    #[arg(long)]
    pub branch_len: usize,

    /// Branch per-block offset from the 10-second spacing.
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub branch_offset: i64,

    /// Submit the branch a second time through the known-block path.
    #[arg(long)]
    pub reinsert: bool,

    /// Seed for the coin-toss tie-break.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Emit JSON instead of text.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub policy: PolicyOverrides,
}

/// Fork geometry for one simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkShape {
    /// Canonical chain length above genesis.
    pub canonical_len: usize,
    /// Canonical per-block time offset.
    pub canonical_offset: i64,
    /// Canonical block number the branch forks from.
    pub ancestor: u64,
    /// Branch length above the ancestor.
    pub branch_len: usize,
    /// Branch per-block time offset.
    pub branch_offset: i64,
}

/// Outcome of one insertion attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attempt {
    /// Entry point the chain chose.
    pub path: InsertPath,
    /// Verdict, with policy rejections reported as `reject`.
    pub verdict: Option<Verdict>,
    /// Head number after the attempt.
    pub head_number: u64,
    /// Head hash after the attempt.
    pub head_hash: BlockHash,
    /// Rejection details, for `reject`.
    pub rejection: Option<RejectionReport>,
    /// Any other error.
    pub error: Option<String>,
}

/// Full simulation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Simulation {
    /// Policy configuration in force.
    pub config: PolicyConfig,
    /// Canonical head before the branch was inserted.
    pub canonical_head: Header,
    /// Branch tip.
    pub branch_tip: Header,
    /// One entry per submission of the branch.
    pub attempts: Vec<Attempt>,
}

/// Build both chains, insert the branch `submissions` times, and collect
/// the outcomes.
pub fn simulate(shape: ForkShape, config: PolicyConfig, seed: u64, submissions: usize) -> Result<Simulation> {
    if shape.canonical_len == 0 {
        bail!("canonical chain must have at least one block");
    }
    if shape.branch_len == 0 {
        bail!("branch must have at least one block");
    }
    if shape.ancestor > shape.canonical_len as u64 {
        bail!(
            "ancestor #{} is above the canonical head #{}",
            shape.ancestor,
            shape.canonical_len
        );
    }

    let g = genesis();
    let chain = BlockChain::with_store(MemoryStore::new(g.clone()), config.clone(), InsertionGate::with_seed(seed))?;
    let canonical = SegmentBuilder::on(&g)
        .time_offset(shape.canonical_offset)
        .build(shape.canonical_len)?;
    chain.insert_chain(&canonical)?;
    let canonical_head = chain.current_head();

    let base = match shape.ancestor {
        0 => g,
        n => canonical.headers()[(n - 1) as usize].clone(),
    };
    let branch = SegmentBuilder::on(&base)
        .time_offset(shape.branch_offset)
        .seed(1)
        .build(shape.branch_len)?;

    let mut attempts = Vec::with_capacity(submissions);
    for _ in 0..submissions {
        let path = if branch.iter().all(|h| chain.header_by_hash(h.hash()).is_some()) {
            InsertPath::Known
        } else {
            InsertPath::Fresh
        };
        let result = chain.insert_chain(&branch);
        let head = chain.current_head();
        let (verdict, rejection, error) = match result {
            Ok(outcome) => (Some(outcome.verdict), None, None),
            Err(InsertError::PolicyRejected(report)) => (Some(Verdict::Reject), Some(*report), None),
            Err(e) => (None, None, Some(e.to_string())),
        };
        attempts.push(Attempt {
            path,
            verdict,
            head_number: head.number(),
            head_hash: *head.hash(),
            rejection,
            error,
        });
    }

    Ok(Simulation {
        config,
        canonical_head,
        branch_tip: branch.tip().clone(),
        attempts,
    })
}

/// Run `mess simulate`.
pub fn run_simulate(args: &SimulateArgs, base: &PolicyConfig) -> Result<u8> {
    let config = args.policy.apply(base)?;
    let shape = ForkShape {
        canonical_len: args.canonical_len,
        canonical_offset: args.canonical_offset,
        ancestor: args.ancestor,
        branch_len: args.branch_len,
        branch_offset: args.branch_offset,
    };
    let submissions = if args.reinsert { 2 } else { 1 };
    let sim = simulate(shape, config, args.seed, submissions)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&sim)?);
        return Ok(0);
    }

    println!(
        "policy: {} (curve {}, span {})",
        if sim.config.enabled { "enabled" } else { "disabled" },
        sim.config.curve,
        sim.config.span_source
    );
    println!(
        "canonical head #{} {}",
        sim.canonical_head.number(),
        sim.canonical_head.hash().short()
    );
    println!(
        "branch tip     #{} {}",
        sim.branch_tip.number(),
        sim.branch_tip.hash().short()
    );
    for (i, attempt) in sim.attempts.iter().enumerate() {
        let verdict = attempt
            .verdict
            .map(|v| v.to_string())
            .unwrap_or_else(|| "error".to_string());
        println!(
            "attempt {} [{}]: {} -> head #{} {}",
            i + 1,
            attempt.path.as_str(),
            verdict,
            attempt.head_number,
            attempt.head_hash.short()
        );
        if let Some(report) = &attempt.rejection {
            println!("  {report}");
        }
        if let Some(error) = &attempt.error {
            println!("  error: {error}");
        }
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape(ancestor: u64, branch_len: usize, branch_offset: i64) -> ForkShape {
        ForkShape {
            canonical_len: 500,
            canonical_offset: 0,
            ancestor,
            branch_len,
            branch_offset,
        }
    }

    #[test]
    fn deep_marginal_branch_is_rejected_on_both_paths() {
        let sim = simulate(shape(250, 250, -1), PolicyConfig::default(), 0, 2).unwrap();
        assert_eq!(sim.attempts.len(), 2);
        assert_eq!(sim.attempts[0].path, InsertPath::Fresh);
        assert_eq!(sim.attempts[1].path, InsertPath::Known);
        for attempt in &sim.attempts {
            assert_eq!(attempt.verdict, Some(Verdict::Reject));
            assert_eq!(attempt.head_number, 500);
            assert_eq!(attempt.rejection.as_ref().unwrap().ancestor.number, 250);
        }
    }

    #[test]
    fn disabled_policy_accepts() {
        let sim = simulate(shape(250, 250, -1), PolicyConfig::disabled(), 0, 1).unwrap();
        assert_eq!(sim.attempts[0].verdict, Some(Verdict::Accept));
        assert_eq!(sim.attempts[0].head_hash, *sim.branch_tip.hash());
    }

    #[test]
    fn fork_from_genesis_is_allowed() {
        let sim = simulate(shape(0, 10, 0), PolicyConfig::default(), 0, 1).unwrap();
        assert_eq!(sim.attempts[0].verdict, Some(Verdict::Side));
    }

    #[test]
    fn invalid_shapes_are_refused() {
        assert!(simulate(shape(501, 1, 0), PolicyConfig::default(), 0, 1).is_err());
        assert!(simulate(shape(1, 0, 0), PolicyConfig::default(), 0, 1).is_err());
    }

    #[test]
    fn json_output_names_verdicts() {
        let sim = simulate(shape(400, 50, 0), PolicyConfig::default(), 0, 1).unwrap();
        let json = serde_json::to_value(&sim).unwrap();
        assert_eq!(json["attempts"][0]["verdict"], "side");
        assert_eq!(json["attempts"][0]["path"], "fresh");
        assert_eq!(json["config"]["curve"], "cubic");
    }
}
