//! # Policy Errors

use mess_core::{BlockHash, InconsistentInput};
use thiserror::Error;

/// Failure to reach a verdict.
///
/// Neither variant is a policy outcome; a rejected reorg is
/// [`Verdict::Reject`](crate::Verdict::Reject), not an error here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// Inputs violate a chain invariant. Indicates a bug upstream.
    #[error("inconsistent input: {0}")]
    InconsistentInput(#[from] InconsistentInput),

    /// The chain reader has no total difficulty for a block it handed out.
    #[error("total difficulty unknown for block #{number} ({hash})")]
    MissingTotalDifficulty {
        /// Block hash.
        hash: BlockHash,
        /// Block number.
        number: u64,
    },

    /// Rejected configuration.
    #[error("invalid policy configuration: {0}")]
    InvalidConfig(String),
}
