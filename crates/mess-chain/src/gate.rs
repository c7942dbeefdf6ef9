//! # Insertion Gate
//!
//! Every segment reaching the chain passes through one of two entry points:
//!
//! - [`InsertionGate::handle_fresh_segment`]: new blocks. Standard
//!   validation runs first, then the blocks are written, then arbitrated.
//! - [`InsertionGate::handle_known_segment_reinsertion`]: every block is
//!   already stored. Nothing is written, but the segment is arbitrated
//!   exactly as a fresh one would be. Already-stored blocks get no bypass.
//!
//! Both paths end in the same private arbitration routine:
//!
//! 1. A tip that is already canonical changes nothing and is `Side`.
//! 2. Compare raw total difficulty of the segment tip and the current head.
//!    Lighter is `Side`. An exact tie is `Side` unless the coin-toss
//!    tie-break is configured and wins.
//! 3. If the policy does not apply (disabled, or outside its activation
//!    window) or the segment simply extends the head, a heavier tip is
//!    `Accept`.
//! 4. Otherwise [`ReorgAcceptancePolicy::decide`] runs at the segment tip.
//!    `Reject` becomes [`InsertError::PolicyRejected`]; the blocks stay
//!    stored. A tie won on the coin is never heavier, so a failing check
//!    leaves it `Side` instead.
//!
//! `Side` therefore means "head unchanged", whether the tip is on a side
//! chain or already canonical.
//!
//! Inconsistent input is logged at `error` level. Debug builds panic on it.

use std::cmp::Ordering;

use mess_core::{Header, InconsistentInput, Segment};
use mess_policy::{
    Assessment, PolicyConfig, PolicyError, RejectionReport, ReorgAcceptancePolicy, TieBreak, Verdict,
};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::{ChainStore, StoreError};

/// Which entry point handled a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsertPath {
    /// New blocks, validated and written before arbitration.
    Fresh,
    /// Blocks already stored.
    Known,
}

impl InsertPath {
    /// Stable lowercase name, used as a metrics label.
    pub fn as_str(self) -> &'static str {
        match self {
            InsertPath::Fresh => "fresh",
            InsertPath::Known => "known",
        }
    }
}

/// Result of a successful insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOutcome {
    /// `Accept` or `Side`. Rejections are errors.
    pub verdict: Verdict,
    /// Entry point that handled the segment.
    pub path: InsertPath,
    /// Canonical head after the insertion.
    pub head: Header,
    /// Tip of the inserted segment.
    pub tip: Header,
    /// Policy assessment, when the policy was consulted.
    pub assessment: Option<Assessment>,
}

impl InsertOutcome {
    /// Whether the canonical head moved to the segment tip.
    pub fn adopted(&self) -> bool {
        self.verdict == Verdict::Accept
    }
}

/// Insertion failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InsertError {
    /// The candidate is heavier by raw total difficulty but does not clear
    /// the time-dependent penalty. The segment remains stored.
    #[error("reorg rejected by antigravity policy: {0}")]
    PolicyRejected(Box<RejectionReport>),

    /// The segment or the store violates a chain invariant.
    #[error("inconsistent input: {0}")]
    InconsistentInput(InconsistentInput),

    /// The chain store refused or could not serve the operation.
    #[error("chain store: {0}")]
    Store(#[from] StoreError),

    /// The policy could not be evaluated.
    #[error("policy: {0}")]
    Policy(PolicyError),
}

impl InsertError {
    /// The rejection report, if this is a policy rejection.
    pub fn rejection(&self) -> Option<&RejectionReport> {
        match self {
            InsertError::PolicyRejected(report) => Some(report),
            _ => None,
        }
    }

    /// Whether this is a policy rejection.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(self, InsertError::PolicyRejected(_))
    }
}

/// Log an invariant violation, panic in debug builds, otherwise convert.
fn inconsistent(err: InconsistentInput) -> InsertError {
    tracing::error!(error = %err, "inconsistent input reached the insertion gate");
    if cfg!(debug_assertions) {
        panic!("inconsistent input: {err}");
    }
    InsertError::InconsistentInput(err)
}

fn from_policy(err: PolicyError) -> InsertError {
    match err {
        PolicyError::InconsistentInput(e) => inconsistent(e),
        PolicyError::MissingTotalDifficulty { hash, number } => {
            InsertError::Store(StoreError::MissingTotalDifficulty { hash, number })
        }
        other => InsertError::Policy(other),
    }
}

/// Arbitrates segments against the canonical chain.
///
/// Holds only the coin used by [`TieBreak::CoinToss`]; everything else is
/// passed in per call, so one gate may serve any number of stores.
#[derive(Debug)]
pub struct InsertionGate {
    coin: Mutex<StdRng>,
}

impl Default for InsertionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl InsertionGate {
    /// A gate whose tie-break coin is seeded from the OS.
    pub fn new() -> Self {
        Self {
            coin: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// A gate with a reproducible tie-break coin.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            coin: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Validate, store and arbitrate a segment containing new blocks.
    pub fn handle_fresh_segment<S: ChainStore + ?Sized>(
        &self,
        store: &mut S,
        config: &PolicyConfig,
        segment: &Segment,
    ) -> Result<InsertOutcome, InsertError> {
        store.validate_segment(segment)?;
        check_parent(&*store, segment)?;
        store.write_segment(segment)?;
        self.arbitrate(store, config, segment, InsertPath::Fresh)
    }

    /// Arbitrate a segment whose blocks are all stored already.
    pub fn handle_known_segment_reinsertion<S: ChainStore + ?Sized>(
        &self,
        store: &mut S,
        config: &PolicyConfig,
        segment: &Segment,
    ) -> Result<InsertOutcome, InsertError> {
        if let Some(missing) = segment.iter().find(|h| !store.contains(h.hash())) {
            return Err(StoreError::UnknownBlock {
                hash: *missing.hash(),
            }
            .into());
        }
        check_parent(&*store, segment)?;
        self.arbitrate(store, config, segment, InsertPath::Known)
    }

    fn arbitrate<S: ChainStore + ?Sized>(
        &self,
        store: &mut S,
        config: &PolicyConfig,
        segment: &Segment,
        path: InsertPath,
    ) -> Result<InsertOutcome, InsertError> {
        let head = store.current_head();
        let tip = segment.tip().clone();
        if store.canonical_hash(tip.number()) == Some(*tip.hash()) {
            metrics::counter!("mess_insert_already_canonical_total", "path" => path.as_str()).increment(1);
            tracing::debug!(
                path = path.as_str(),
                head = head.number(),
                tip = tip.number(),
                "segment already canonical"
            );
            return Ok(InsertOutcome {
                verdict: Verdict::Side,
                path,
                head,
                tip,
                assessment: None,
            });
        }
        let head_td = stored_td(&*store, &head)?;
        let tip_td = stored_td(&*store, &tip)?;

        let tie = tip_td == head_td;
        let contender = match tip_td.cmp(&head_td) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => match config.tie_break {
                TieBreak::PreferCanonical => false,
                TieBreak::CoinToss => self.coin.lock().gen_bool(0.5),
            },
        };
        if !contender {
            return Ok(self.side(head, tip, path));
        }

        let ancestor = store
            .common_ancestor_of(&tip)
            .ok_or(StoreError::NoCommonAncestor {
                hash: *tip.hash(),
                number: tip.number(),
            })?;

        let assessment = if ancestor.hash() == head.hash() || !config.applies_at(head.number()) {
            None
        } else {
            let policy = ReorgAcceptancePolicy::from_config(config);
            let assessment = policy
                .decide(&*store, &ancestor, &head, &tip)
                .map_err(from_policy)?;
            if assessment.verdict == Verdict::Reject {
                if tie {
                    return Ok(self.side(head, tip, path));
                }
                return Err(self.reject(&assessment, &ancestor, &head, &tip, path));
            }
            Some(assessment)
        };

        store.set_canonical_head(tip.hash())?;
        record(Verdict::Accept, path);
        tracing::info!(
            path = path.as_str(),
            ancestor = ancestor.number(),
            old_head = head.number(),
            new_head = tip.number(),
            hash = %tip.hash(),
            reorg = ancestor.hash() != head.hash(),
            "segment adopted as canonical"
        );
        Ok(InsertOutcome {
            verdict: Verdict::Accept,
            path,
            head: tip.clone(),
            tip,
            assessment,
        })
    }

    fn side(&self, head: Header, tip: Header, path: InsertPath) -> InsertOutcome {
        record(Verdict::Side, path);
        tracing::debug!(
            path = path.as_str(),
            head = head.number(),
            tip = tip.number(),
            hash = %tip.hash(),
            "segment stored as side chain"
        );
        InsertOutcome {
            verdict: Verdict::Side,
            path,
            head,
            tip,
            assessment: None,
        }
    }

    fn reject(
        &self,
        assessment: &Assessment,
        ancestor: &Header,
        head: &Header,
        tip: &Header,
        path: InsertPath,
    ) -> InsertError {
        let report = RejectionReport::new(assessment, ancestor, head, tip);
        record(Verdict::Reject, path);
        metrics::counter!("mess_policy_rejections_total").increment(1);
        tracing::warn!(
            path = path.as_str(),
            ancestor = ancestor.number(),
            head = head.number(),
            tip = tip.number(),
            elapsed = report.elapsed,
            td_ratio = report.td_ratio,
            required = report.required_ratio(),
            "reorg rejected by antigravity policy"
        );
        InsertError::PolicyRejected(Box::new(report))
    }
}

fn record(verdict: Verdict, path: InsertPath) {
    metrics::counter!(
        "mess_insert_verdicts_total",
        "verdict" => verdict.as_str(),
        "path" => path.as_str()
    )
    .increment(1);
}

fn check_parent<S: ChainStore + ?Sized>(store: &S, segment: &Segment) -> Result<(), InsertError> {
    let parent = store
        .header_by_hash(segment.base_parent_hash())
        .ok_or(StoreError::UnknownParent {
            number: segment.first().number(),
            parent: *segment.base_parent_hash(),
        })?;
    segment.check_attaches_to(&parent).map_err(inconsistent)
}

fn stored_td<S: ChainStore + ?Sized>(store: &S, header: &Header) -> Result<mess_core::Difficulty, InsertError> {
    store
        .total_difficulty_of(header.hash(), header.number())
        .ok_or_else(|| {
            StoreError::MissingTotalDifficulty {
                hash: *header.hash(),
                number: header.number(),
            }
            .into()
        })
}

#[cfg(test)]
mod tests {
    use mess_core::ChainReader;

    use super::*;
    use crate::generate::{genesis, SegmentBuilder};
    use crate::store::MemoryStore;

    fn extended(len: usize) -> (MemoryStore, Segment) {
        let g = genesis();
        let mut store = MemoryStore::new(g.clone());
        let main = SegmentBuilder::on(&g).build(len).unwrap();
        let gate = InsertionGate::with_seed(0);
        let out = gate
            .handle_fresh_segment(&mut store, &PolicyConfig::default(), &main)
            .unwrap();
        assert_eq!(out.verdict, Verdict::Accept);
        (store, main)
    }

    #[test]
    fn extension_bypasses_policy() {
        let (store, main) = extended(50);
        assert_eq!(store.current_head(), main.tip().clone());
    }

    #[test]
    fn lighter_branch_is_side() {
        let (mut store, main) = extended(50);
        let fork = &main.headers()[39];
        let side = SegmentBuilder::on(fork).seed(1).build(5).unwrap();
        let out = InsertionGate::with_seed(0)
            .handle_fresh_segment(&mut store, &PolicyConfig::default(), &side)
            .unwrap();
        assert_eq!(out.verdict, Verdict::Side);
        assert_eq!(out.head, main.tip().clone());
        assert!(store.contains(side.tip().hash()));
    }

    #[test]
    fn known_path_requires_stored_blocks() {
        let (mut store, main) = extended(5);
        let fresh = SegmentBuilder::on(main.tip()).build(1).unwrap();
        let err = InsertionGate::with_seed(0)
            .handle_known_segment_reinsertion(&mut store, &PolicyConfig::default(), &fresh)
            .unwrap_err();
        assert!(matches!(err, InsertError::Store(StoreError::UnknownBlock { .. })));
    }

    #[test]
    fn tie_prefers_canonical_by_default() {
        let (mut store, main) = extended(20);
        let fork = &main.headers()[9];
        let twin = SegmentBuilder::on(fork).seed(1).build(10).unwrap();
        assert_eq!(twin.difficulty_sum(), Segment::new(main.headers()[10..].to_vec()).unwrap().difficulty_sum());
        let out = InsertionGate::with_seed(0)
            .handle_fresh_segment(&mut store, &PolicyConfig::default(), &twin)
            .unwrap();
        assert_eq!(out.verdict, Verdict::Side);
    }

    #[test]
    fn coin_toss_breaks_ties_both_ways() {
        let config = PolicyConfig {
            tie_break: TieBreak::CoinToss,
            ..PolicyConfig::default()
        };
        let gate = InsertionGate::with_seed(7);
        let mut seen = std::collections::HashSet::new();
        for seed in 1..=64u64 {
            let (mut store, main) = extended(20);
            let fork = &main.headers()[9];
            let twin = SegmentBuilder::on(fork).seed(seed).build(10).unwrap();
            let out = gate.handle_fresh_segment(&mut store, &config, &twin).unwrap();
            seen.insert(out.verdict);
        }
        assert!(seen.contains(&Verdict::Accept));
        assert!(seen.contains(&Verdict::Side));
    }

    #[test]
    fn deep_tie_never_rejects_under_coin_toss() {
        let config = PolicyConfig {
            tie_break: TieBreak::CoinToss,
            ..PolicyConfig::default()
        };
        let gate = InsertionGate::with_seed(3);
        for seed in 1..=32u64 {
            let (mut store, main) = extended(100);
            let fork = &main.headers()[9];
            let twin = SegmentBuilder::on(fork).seed(seed).build(90).unwrap();
            assert_eq!(
                store.total_difficulty_of(twin.tip().hash(), twin.tip().number()),
                store.total_difficulty_of(main.tip().hash(), main.tip().number())
            );
            let out = gate.handle_fresh_segment(&mut store, &config, &twin).unwrap();
            assert_eq!(out.verdict, Verdict::Side, "seed {seed}");
            assert_eq!(store.current_head(), main.tip().clone());

            let again = gate
                .handle_known_segment_reinsertion(&mut store, &config, &twin)
                .unwrap();
            assert_eq!(again.verdict, Verdict::Side, "seed {seed}");
        }
    }

    #[test]
    fn canonical_reinsertion_leaves_head_alone() {
        let config = PolicyConfig {
            tie_break: TieBreak::CoinToss,
            ..PolicyConfig::default()
        };
        let (mut store, main) = extended(20);
        let prefix = Segment::new(main.headers()[..5].to_vec()).unwrap();
        let gate = InsertionGate::with_seed(0);
        for seg in [&main, &prefix] {
            for _ in 0..8 {
                let out = gate
                    .handle_known_segment_reinsertion(&mut store, &config, seg)
                    .unwrap();
                assert_eq!(out.verdict, Verdict::Side);
                assert_eq!(out.head, main.tip().clone());
                assert!(out.assessment.is_none());
            }
        }
        assert_eq!(store.current_head(), main.tip().clone());
    }

    #[test]
    fn parent_unknown_is_store_error() {
        let (mut store, _) = extended(3);
        let elsewhere = SegmentBuilder::on(&genesis()).seed(5).build(3).unwrap();
        let orphan = Segment::new(elsewhere.headers()[1..].to_vec()).unwrap();
        let err = InsertionGate::with_seed(0)
            .handle_fresh_segment(&mut store, &PolicyConfig::default(), &orphan)
            .unwrap_err();
        assert!(matches!(err, InsertError::Store(StoreError::UnknownParent { .. })));
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "inconsistent input"))]
    fn segment_older_than_parent_is_inconsistent() {
        let (mut store, main) = extended(3);
        let parent = main.tip();
        let early = mess_core::Header::new(
            parent.number() + 1,
            parent.timestamp() - 1,
            parent.difficulty().clone(),
            *parent.hash(),
            0,
        );
        let seg = Segment::new(vec![early.clone()]).unwrap();
        let err = InsertionGate::with_seed(0)
            .handle_fresh_segment(&mut store, &PolicyConfig::default(), &seg)
            .unwrap_err();
        assert!(matches!(
            err,
            InsertError::InconsistentInput(InconsistentInput::TimestampRegression { .. })
        ));
        assert!(!store.contains(early.hash()));
    }
}
