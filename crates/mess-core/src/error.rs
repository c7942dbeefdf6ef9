//! # Error Types — Contract Violations
//!
//! Defines [`InconsistentInput`], the error raised when data reaching the
//! reorg gate breaks an invariant that upstream validation should already
//! have enforced.
//!
//! ## Design
//!
//! - These errors indicate a bug in a collaborator, not a hostile peer.
//!   Callers must not guess a verdict when one is returned.
//! - Every variant carries the block numbers (and hashes where useful)
//!   needed to locate the offending header in logs.

use thiserror::Error;

use crate::hash::BlockHash;

/// An invariant violation in headers handed to the reorg gate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InconsistentInput {
    /// A segment must contain at least one header.
    #[error("segment is empty")]
    EmptySegment,

    /// A header does not reference its predecessor in the segment.
    #[error("broken parent link at block #{number}: expected parent {expected}, got {actual}")]
    BrokenLink {
        /// Number of the header with the wrong parent reference.
        number: u64,
        /// Hash of the preceding header in the segment.
        expected: BlockHash,
        /// Parent hash recorded in the header.
        actual: BlockHash,
    },

    /// Header numbers inside a segment must increase by exactly one.
    #[error("non-consecutive block number: expected #{expected}, got #{actual}")]
    NonConsecutiveNumber {
        /// The number implied by the previous header.
        expected: u64,
        /// The number found.
        actual: u64,
    },

    /// A header carries a timestamp earlier than an ancestor's.
    #[error("timestamp regression at block #{number}: {timestamp} < ancestor timestamp {ancestor_timestamp}")]
    TimestampRegression {
        /// Number of the offending header.
        number: u64,
        /// Its timestamp.
        timestamp: u64,
        /// The earlier header's (larger) timestamp.
        ancestor_timestamp: u64,
    },

    /// A chain tip sits below the common ancestor it is measured from.
    #[error("{side} tip #{tip} is below common ancestor #{ancestor}")]
    TipBelowAncestor {
        /// Which chain the tip belongs to ("candidate" or "canonical").
        side: &'static str,
        /// Tip number.
        tip: u64,
        /// Common ancestor number.
        ancestor: u64,
    },

    /// A tip's total difficulty is lower than its ancestor's.
    #[error("total difficulty of {side} tip {hash} is lower than its common ancestor's")]
    TotalDifficultyUnderflow {
        /// Which chain the tip belongs to ("candidate" or "canonical").
        side: &'static str,
        /// Hash of the tip.
        hash: BlockHash,
    },
}
