//! # Reorg Acceptance Policy
//!
//! Given a candidate branch that is already heavier by raw total difficulty,
//! decide whether it is heavy enough to replace the canonical chain:
//!
//! ```text
//! elapsed  = span selected by SpanSource
//! required = curve(elapsed)                         (num / den)
//! accept  <=> candidate_td * den >= num * reference_td
//! ```
//!
//! Both totals are subchain totals since the common ancestor. The comparison
//! is a single big-integer cross-multiplication, so there is no rounding at
//! the boundary.

use std::fmt;

use mess_core::{BlockHash, ChainReader, Difficulty, Header};
use serde::{Deserialize, Serialize};

use crate::config::PolicyConfig;
use crate::curve::{CurveValue, PenaltyCurve};
use crate::error::PolicyError;
use crate::ratio::{DifficultyComparison, DifficultyRatioEvaluator, SpanSource};

/// Outcome of arbitrating one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Adopt the segment as the new canonical chain.
    Accept,
    /// Heavier by raw difficulty but fails the penalty check.
    Reject,
    /// Not heavier; store as a side chain.
    Side,
}

impl Verdict {
    /// Stable lowercase name, used as a metrics label.
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Accept => "accept",
            Verdict::Reject => "reject",
            Verdict::Side => "side",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verdict together with the numbers that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assessment {
    /// `Accept` or `Reject`.
    pub verdict: Verdict,
    /// Subchain totals and spans.
    pub comparison: DifficultyComparison,
    /// Curve value at `comparison.elapsed`.
    pub required: CurveValue,
}

/// Whether `candidate / reference >= required`, exactly.
pub fn clears_penalty(candidate: &Difficulty, reference: &Difficulty, required: CurveValue) -> bool {
    let lhs = candidate.as_biguint() * required.denominator;
    let rhs = reference.as_biguint() * required.numerator;
    lhs >= rhs
}

/// The antigravity check. Pure and stateless after construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReorgAcceptancePolicy {
    curve: PenaltyCurve,
    evaluator: DifficultyRatioEvaluator,
}

impl ReorgAcceptancePolicy {
    /// Build a policy with the given curve and span convention.
    pub fn new(curve: PenaltyCurve, span_source: SpanSource) -> Self {
        Self {
            curve,
            evaluator: DifficultyRatioEvaluator::new(span_source),
        }
    }

    /// Build from a configuration snapshot. The enablement flag and the
    /// activation window are the caller's concern.
    pub fn from_config(config: &PolicyConfig) -> Self {
        Self::new(config.curve, config.span_source)
    }

    /// The active curve.
    pub fn curve(&self) -> PenaltyCurve {
        self.curve
    }

    /// The span convention.
    pub fn span_source(&self) -> SpanSource {
        self.evaluator.span_source()
    }

    /// Decide a reorg from `head` to `tip` through `ancestor`.
    ///
    /// Callers invoke this only once the candidate is known to be heavier by
    /// raw total difficulty; the verdict is `Accept` or `Reject`.
    pub fn decide<R: ChainReader + ?Sized>(
        &self,
        reader: &R,
        ancestor: &Header,
        head: &Header,
        tip: &Header,
    ) -> Result<Assessment, PolicyError> {
        let comparison = self.evaluator.evaluate(reader, ancestor, head, tip)?;
        let assessment = self.assess(comparison);
        tracing::trace!(
            ancestor = ancestor.number(),
            head = head.number(),
            tip = tip.number(),
            elapsed = assessment.comparison.elapsed,
            required = %assessment.required,
            verdict = %assessment.verdict,
            "antigravity check evaluated"
        );
        Ok(assessment)
    }

    /// Apply the curve to an existing comparison.
    pub fn assess(&self, comparison: DifficultyComparison) -> Assessment {
        let required = self.curve.evaluate(comparison.elapsed);
        let verdict = if clears_penalty(&comparison.candidate_td, &comparison.reference_td, required) {
            Verdict::Accept
        } else {
            Verdict::Reject
        };
        Assessment {
            verdict,
            comparison,
            required,
        }
    }
}

/// Number and hash of a block named in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    /// Block number.
    pub number: u64,
    /// Block hash.
    pub hash: BlockHash,
}

impl From<&Header> for BlockRef {
    fn from(header: &Header) -> Self {
        Self {
            number: header.number(),
            hash: *header.hash(),
        }
    }
}

impl fmt::Display for BlockRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.number, self.hash.short())
    }
}

/// Structured record of a rejected reorg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectionReport {
    /// Common ancestor.
    pub ancestor: BlockRef,
    /// Canonical head at the time of the decision.
    pub head: BlockRef,
    /// Candidate tip.
    pub tip: BlockRef,
    /// Canonical head timestamp minus ancestor timestamp.
    pub canonical_span: u64,
    /// Candidate tip timestamp minus ancestor timestamp.
    pub candidate_span: u64,
    /// Span fed to the curve.
    pub elapsed: u64,
    /// Candidate subchain total difficulty.
    pub candidate_td: Difficulty,
    /// Canonical subchain total difficulty.
    pub reference_td: Difficulty,
    /// Display-only `candidate_td / reference_td`.
    pub td_ratio: f64,
    /// Required ratio numerator.
    pub required_numerator: u64,
    /// Required ratio denominator.
    pub required_denominator: u64,
}

impl RejectionReport {
    /// Describe an assessment over the given blocks.
    pub fn new(assessment: &Assessment, ancestor: &Header, head: &Header, tip: &Header) -> Self {
        let cmp = &assessment.comparison;
        Self {
            ancestor: ancestor.into(),
            head: head.into(),
            tip: tip.into(),
            canonical_span: cmp.reference_span,
            candidate_span: cmp.candidate_span,
            elapsed: cmp.elapsed,
            candidate_td: cmp.candidate_td.clone(),
            reference_td: cmp.reference_td.clone(),
            td_ratio: cmp.ratio_f64(),
            required_numerator: assessment.required.numerator,
            required_denominator: assessment.required.denominator,
        }
    }

    /// Display-only required ratio.
    pub fn required_ratio(&self) -> f64 {
        self.required_numerator as f64 / self.required_denominator as f64
    }
}

impl fmt::Display for RejectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ancestor {} head {} tip {}: td ratio {:.4} below required {:.4} after {}s \
             (canonical span {}s, candidate span {}s)",
            self.ancestor,
            self.head,
            self.tip,
            self.td_ratio,
            self.required_ratio(),
            self.elapsed,
            self.canonical_span,
            self.candidate_span,
        )
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn matches_u128_reference(
            candidate in any::<u64>(),
            reference in any::<u64>(),
            elapsed in 0u64..40_000,
            sinusoidal in any::<bool>(),
        ) {
            let curve = if sinusoidal { PenaltyCurve::Sinusoidal } else { PenaltyCurve::Cubic };
            let required = curve.evaluate(elapsed);
            let expected = u128::from(candidate) * u128::from(required.denominator)
                >= u128::from(reference) * u128::from(required.numerator);
            prop_assert_eq!(
                clears_penalty(&Difficulty::from(candidate), &Difficulty::from(reference), required),
                expected
            );
        }

        #[test]
        fn unity_reduces_to_raw_comparison(candidate in any::<u64>(), reference in any::<u64>()) {
            let floor = PenaltyCurve::Cubic.floor();
            prop_assert_eq!(
                clears_penalty(&Difficulty::from(candidate), &Difficulty::from(reference), floor),
                candidate >= reference
            );
        }
    }
}
