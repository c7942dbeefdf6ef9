//! # Subchain Difficulty Comparison
//!
//! Measures the work each side of a fork has accumulated since the common
//! ancestor. Each side is measured from the ancestor to its own tip, so the
//! comparison is aligned on elapsed time rather than on block height.
//!
//! The evaluator returns both subchain totals. The caller cross-multiplies
//! them against the curve value; the `f64` ratio is for display only.

use mess_core::{ChainReader, Difficulty, Header, InconsistentInput};
use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

/// Which side's time span feeds the penalty curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanSource {
    /// `candidate_tip.timestamp - ancestor.timestamp`.
    #[default]
    Candidate,
    /// `canonical_head.timestamp - ancestor.timestamp`.
    Canonical,
}

impl SpanSource {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            SpanSource::Candidate => "candidate",
            SpanSource::Canonical => "canonical",
        }
    }
}

impl std::fmt::Display for SpanSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work and time accumulated by both sides since the common ancestor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyComparison {
    /// `td(candidate tip) - td(ancestor)`.
    pub candidate_td: Difficulty,
    /// `td(canonical head) - td(ancestor)`.
    pub reference_td: Difficulty,
    /// Candidate tip timestamp minus ancestor timestamp.
    pub candidate_span: u64,
    /// Canonical head timestamp minus ancestor timestamp.
    pub reference_span: u64,
    /// The span selected by the evaluator's [`SpanSource`].
    pub elapsed: u64,
}

impl DifficultyComparison {
    /// Lossy `candidate_td / reference_td`. Infinite when the canonical side
    /// has no work past the ancestor.
    pub fn ratio_f64(&self) -> f64 {
        if self.reference_td.is_zero() {
            return f64::INFINITY;
        }
        self.candidate_td.to_f64() / self.reference_td.to_f64()
    }
}

/// Reads subchain totals from a [`ChainReader`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DifficultyRatioEvaluator {
    span_source: SpanSource,
}

impl DifficultyRatioEvaluator {
    /// Create an evaluator with a fixed span convention.
    pub fn new(span_source: SpanSource) -> Self {
        Self { span_source }
    }

    /// The span convention chosen at construction.
    pub fn span_source(&self) -> SpanSource {
        self.span_source
    }

    /// Compare the candidate branch ending at `tip` with the canonical chain
    /// ending at `head`, both measured from `ancestor`.
    pub fn evaluate<R: ChainReader + ?Sized>(
        &self,
        reader: &R,
        ancestor: &Header,
        head: &Header,
        tip: &Header,
    ) -> Result<DifficultyComparison, PolicyError> {
        let candidate_span = span_since(ancestor, tip, "candidate")?;
        let reference_span = span_since(ancestor, head, "canonical")?;

        let ancestor_td = total_difficulty(reader, ancestor)?;
        let candidate_td = total_difficulty(reader, tip)?
            .checked_sub(&ancestor_td)
            .ok_or(InconsistentInput::TotalDifficultyUnderflow {
                side: "candidate",
                hash: *tip.hash(),
            })?;
        let reference_td = total_difficulty(reader, head)?
            .checked_sub(&ancestor_td)
            .ok_or(InconsistentInput::TotalDifficultyUnderflow {
                side: "canonical",
                hash: *head.hash(),
            })?;

        let elapsed = match self.span_source {
            SpanSource::Candidate => candidate_span,
            SpanSource::Canonical => reference_span,
        };

        Ok(DifficultyComparison {
            candidate_td,
            reference_td,
            candidate_span,
            reference_span,
            elapsed,
        })
    }
}

fn span_since(ancestor: &Header, tip: &Header, side: &'static str) -> Result<u64, InconsistentInput> {
    if tip.number() < ancestor.number() {
        return Err(InconsistentInput::TipBelowAncestor {
            side,
            tip: tip.number(),
            ancestor: ancestor.number(),
        });
    }
    tip.timestamp()
        .checked_sub(ancestor.timestamp())
        .ok_or(InconsistentInput::TimestampRegression {
            number: tip.number(),
            timestamp: tip.timestamp(),
            ancestor_timestamp: ancestor.timestamp(),
        })
}

fn total_difficulty<R: ChainReader + ?Sized>(reader: &R, header: &Header) -> Result<Difficulty, PolicyError> {
    reader
        .total_difficulty_of(header.hash(), header.number())
        .ok_or(PolicyError::MissingTotalDifficulty {
            hash: *header.hash(),
            number: header.number(),
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use mess_core::BlockHash;

    use super::*;

    /// Minimal reader: a fixed head plus a table of totals.
    pub(crate) struct FixedReader {
        pub head: Header,
        pub totals: HashMap<BlockHash, Difficulty>,
    }

    impl FixedReader {
        pub fn new(head: &Header) -> Self {
            Self {
                head: head.clone(),
                totals: HashMap::new(),
            }
        }

        pub fn with_td(mut self, header: &Header, td: u64) -> Self {
            self.totals.insert(*header.hash(), Difficulty::from(td));
            self
        }
    }

    impl ChainReader for FixedReader {
        fn header_by_hash(&self, _hash: &BlockHash) -> Option<Header> {
            None
        }

        fn total_difficulty_of(&self, hash: &BlockHash, _number: u64) -> Option<Difficulty> {
            self.totals.get(hash).cloned()
        }

        fn current_head(&self) -> Header {
            self.head.clone()
        }

        fn common_ancestor_of(&self, _header: &Header) -> Option<Header> {
            None
        }
    }

    pub(crate) fn header(number: u64, timestamp: u64, nonce: u64) -> Header {
        Header::new(number, timestamp, Difficulty::from(1u64), BlockHash::ZERO, nonce)
    }

    #[test]
    fn measures_both_sides_from_ancestor() {
        let ancestor = header(10, 100, 0);
        let head = header(20, 200, 1);
        let tip = header(18, 190, 2);
        let reader = FixedReader::new(&head)
            .with_td(&ancestor, 1_000)
            .with_td(&head, 1_500)
            .with_td(&tip, 1_600);

        let cmp = DifficultyRatioEvaluator::default()
            .evaluate(&reader, &ancestor, &head, &tip)
            .unwrap();
        assert_eq!(cmp.candidate_td, Difficulty::from(600u64));
        assert_eq!(cmp.reference_td, Difficulty::from(500u64));
        assert_eq!(cmp.candidate_span, 90);
        assert_eq!(cmp.reference_span, 100);
        assert_eq!(cmp.elapsed, 90);
        assert!((cmp.ratio_f64() - 1.2).abs() < 1e-12);

        let canonical = DifficultyRatioEvaluator::new(SpanSource::Canonical)
            .evaluate(&reader, &ancestor, &head, &tip)
            .unwrap();
        assert_eq!(canonical.elapsed, 100);
    }

    #[test]
    fn missing_total_is_surfaced() {
        let ancestor = header(10, 100, 0);
        let head = header(20, 200, 1);
        let tip = header(18, 190, 2);
        let reader = FixedReader::new(&head).with_td(&ancestor, 1).with_td(&head, 2);
        let err = DifficultyRatioEvaluator::default()
            .evaluate(&reader, &ancestor, &head, &tip)
            .unwrap_err();
        assert_eq!(
            err,
            PolicyError::MissingTotalDifficulty {
                hash: *tip.hash(),
                number: 18
            }
        );
    }

    #[test]
    fn tip_below_ancestor_is_inconsistent() {
        let ancestor = header(10, 100, 0);
        let head = header(20, 200, 1);
        let tip = header(9, 190, 2);
        let reader = FixedReader::new(&head);
        let err = DifficultyRatioEvaluator::default()
            .evaluate(&reader, &ancestor, &head, &tip)
            .unwrap_err();
        assert!(matches!(
            err,
            PolicyError::InconsistentInput(InconsistentInput::TipBelowAncestor { side: "candidate", .. })
        ));
    }

    #[test]
    fn timestamp_before_ancestor_is_inconsistent() {
        let ancestor = header(10, 100, 0);
        let head = header(20, 99, 1);
        let tip = header(18, 190, 2);
        let reader = FixedReader::new(&head);
        let err = DifficultyRatioEvaluator::default()
            .evaluate(&reader, &ancestor, &head, &tip)
            .unwrap_err();
        assert!(matches!(
            err,
            PolicyError::InconsistentInput(InconsistentInput::TimestampRegression { number: 20, .. })
        ));
    }

    #[test]
    fn total_underflow_is_inconsistent() {
        let ancestor = header(10, 100, 0);
        let head = header(20, 200, 1);
        let tip = header(18, 190, 2);
        let reader = FixedReader::new(&head)
            .with_td(&ancestor, 1_000)
            .with_td(&head, 1_500)
            .with_td(&tip, 999);
        let err = DifficultyRatioEvaluator::default()
            .evaluate(&reader, &ancestor, &head, &tip)
            .unwrap_err();
        assert!(matches!(
            err,
            PolicyError::InconsistentInput(InconsistentInput::TotalDifficultyUnderflow { side: "candidate", .. })
        ));
    }

    #[test]
    fn zero_reference_gives_infinite_display_ratio() {
        let cmp = DifficultyComparison {
            candidate_td: Difficulty::from(5u64),
            reference_td: Difficulty::zero(),
            candidate_span: 1,
            reference_span: 0,
            elapsed: 1,
        };
        assert!(cmp.ratio_f64().is_infinite());
    }
}
