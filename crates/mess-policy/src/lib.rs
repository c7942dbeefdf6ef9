//! # mess-policy — Antigravity Reorg Acceptance
//!
//! Decides whether a candidate branch that is already heavier by raw total
//! difficulty is heavy *enough* to replace the canonical chain, given how
//! far back it diverges.
//!
//! - **Curve** (`curve.rs`): `PenaltyCurve`, the time-dependent required
//!   ratio. Cubic polynomial (default) and the legacy sinusoid, both as exact
//!   rationals.
//!
//! - **Ratio** (`ratio.rs`): `DifficultyRatioEvaluator`, which reads the
//!   candidate and canonical subchain totals since the common ancestor and
//!   selects the time span fed to the curve.
//!
//! - **Policy** (`policy.rs`): `ReorgAcceptancePolicy::decide`, producing an
//!   `Assessment` with an Accept or Reject verdict, and the structured
//!   `RejectionReport`.
//!
//! - **Config** (`config.rs`): `PolicyConfig`, the enablement flag plus curve,
//!   span, tie-break and activation window settings.
//!
//! ## Crate Policy
//!
//! - Depends only on `mess-core` internally.
//! - Every type here is immutable after construction and `Send + Sync`.
//! - The accept/reject decision never touches floating point. Floats appear
//!   only in the sinusoid's one-time quantization and in display ratios.

pub mod config;
pub mod curve;
pub mod error;
pub mod policy;
pub mod ratio;

pub use config::{PolicyConfig, TieBreak};
pub use curve::{CurveValue, PenaltyCurve, UnknownCurve};
pub use error::PolicyError;
pub use policy::{clears_penalty, Assessment, BlockRef, RejectionReport, ReorgAcceptancePolicy, Verdict};
pub use ratio::{DifficultyComparison, DifficultyRatioEvaluator, SpanSource};
