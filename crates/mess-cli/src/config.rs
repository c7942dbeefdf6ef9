//! # Policy Configuration Loading
//!
//! The global `--config <path>` flag names a YAML or JSON document that
//! deserializes into [`PolicyConfig`]. Subcommands that build chains accept
//! [`PolicyOverrides`] on top of it; a flag always wins over the file.

use std::path::Path;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use mess_policy::{PenaltyCurve, PolicyConfig, SpanSource, TieBreak};

/// Penalty curve selection on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurveArg {
    /// Cubic polynomial (default).
    Cubic,
    /// Legacy sinusoid.
    Sinusoidal,
}

impl From<CurveArg> for PenaltyCurve {
    fn from(arg: CurveArg) -> Self {
        match arg {
            CurveArg::Cubic => PenaltyCurve::Cubic,
            CurveArg::Sinusoidal => PenaltyCurve::Sinusoidal,
        }
    }
}

/// Span source selection on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpanArg {
    /// Candidate tip timestamp minus ancestor timestamp.
    Candidate,
    /// Canonical head timestamp minus ancestor timestamp.
    Canonical,
}

impl From<SpanArg> for SpanSource {
    fn from(arg: SpanArg) -> Self {
        match arg {
            SpanArg::Candidate => SpanSource::Candidate,
            SpanArg::Canonical => SpanSource::Canonical,
        }
    }
}

/// Tie-break selection on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TieBreakArg {
    /// Keep the canonical head on exact ties.
    PreferCanonical,
    /// Flip a coin on exact ties.
    CoinToss,
}

impl From<TieBreakArg> for TieBreak {
    fn from(arg: TieBreakArg) -> Self {
        match arg {
            TieBreakArg::PreferCanonical => TieBreak::PreferCanonical,
            TieBreakArg::CoinToss => TieBreak::CoinToss,
        }
    }
}

/// Per-command policy flags layered over the configuration file.
#[derive(Args, Debug, Clone, Default)]
pub struct PolicyOverrides {
    /// Run with the antigravity policy switched off.
    #[arg(long)]
    pub disable_policy: bool,

    /// Penalty curve.
    #[arg(long, value_enum)]
    pub curve: Option<CurveArg>,

    /// Which side's time span feeds the curve.
    #[arg(long, value_enum)]
    pub span_source: Option<SpanArg>,

    /// Resolution of exact total-difficulty ties.
    #[arg(long, value_enum)]
    pub tie_break: Option<TieBreakArg>,

    /// First head number at which the policy applies.
    #[arg(long)]
    pub activation_block: Option<u64>,

    /// First head number at which the policy stops applying.
    #[arg(long)]
    pub deactivation_block: Option<u64>,
}

impl PolicyOverrides {
    /// Apply the flags to `base` and validate the result.
    pub fn apply(&self, base: &PolicyConfig) -> Result<PolicyConfig> {
        let mut config = base.clone();
        if self.disable_policy {
            config.enabled = false;
        }
        if let Some(curve) = self.curve {
            config.curve = curve.into();
        }
        if let Some(span) = self.span_source {
            config.span_source = span.into();
        }
        if let Some(tie) = self.tie_break {
            config.tie_break = tie.into();
        }
        if self.activation_block.is_some() {
            config.activation_block = self.activation_block;
        }
        if self.deactivation_block.is_some() {
            config.deactivation_block = self.deactivation_block;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Load a policy configuration file, or defaults when `path` is `None`.
///
/// `.json` files are parsed as JSON; anything else as YAML.
pub fn load_policy_config(path: Option<&Path>) -> Result<PolicyConfig> {
    let Some(path) = path else {
        return Ok(PolicyConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let config: PolicyConfig = if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("failed to parse JSON config {}", path.display()))?
    } else {
        serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse YAML config {}", path.display()))?
    };
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    tracing::debug!(path = %path.display(), ?config, "loaded policy configuration");
    Ok(config)
}
