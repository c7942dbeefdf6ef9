//! # Policy Configuration
//!
//! `PolicyConfig` is owned by the chain instance and snapshotted once per
//! insertion. Every field has a default, so partial YAML or JSON documents
//! are accepted:
//!
//! ```yaml
//! enabled: true
//! curve: cubic
//! activation_block: 11380000
//! ```

use serde::{Deserialize, Serialize};

use crate::curve::PenaltyCurve;
use crate::error::PolicyError;
use crate::ratio::SpanSource;

/// How an exact tie in raw total difficulty is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep the canonical head; the candidate is stored as a side chain.
    #[default]
    PreferCanonical,
    /// Adopt the candidate with probability one half. Non-deterministic.
    CoinToss,
}

impl TieBreak {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            TieBreak::PreferCanonical => "prefer_canonical",
            TieBreak::CoinToss => "coin_toss",
        }
    }
}

/// Reorg gate configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PolicyConfig {
    /// Master switch. When `false` plain total-difficulty fork choice applies.
    pub enabled: bool,
    /// Penalty curve family.
    pub curve: PenaltyCurve,
    /// Which side's time span feeds the curve.
    pub span_source: SpanSource,
    /// Resolution of exact raw-difficulty ties.
    pub tie_break: TieBreak,
    /// First canonical head number at which the policy applies.
    pub activation_block: Option<u64>,
    /// First canonical head number at which the policy no longer applies.
    pub deactivation_block: Option<u64>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            curve: PenaltyCurve::default(),
            span_source: SpanSource::default(),
            tie_break: TieBreak::default(),
            activation_block: None,
            deactivation_block: None,
        }
    }
}

impl PolicyConfig {
    /// Defaults with the master switch off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Whether the policy governs an insertion made while the canonical head
    /// is at `head_number`.
    pub fn applies_at(&self, head_number: u64) -> bool {
        if !self.enabled {
            return false;
        }
        if self.activation_block.is_some_and(|start| head_number < start) {
            return false;
        }
        if self.deactivation_block.is_some_and(|end| head_number >= end) {
            return false;
        }
        true
    }

    /// Reject an empty activation window.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if let (Some(start), Some(end)) = (self.activation_block, self.deactivation_block) {
            if end <= start {
                return Err(PolicyError::InvalidConfig(format!(
                    "deactivation_block ({end}) must be greater than activation_block ({start})"
                )));
            }
        }
        Ok(())
    }
}
