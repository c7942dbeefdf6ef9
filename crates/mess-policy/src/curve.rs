//! # Penalty Curves
//!
//! A penalty curve maps the time elapsed since the common ancestor to the
//! minimum ratio `candidate_td / canonical_td` a reorg must reach. Both
//! curves start at exactly 1 (no penalty) and saturate at 31 after roughly
//! seven hours.
//!
//! ## Cubic (default)
//!
//! ```text
//! x   = min(elapsed, 25132)
//! num = 128 + (3x² - ⌊2x³ / 25132⌋) * 3840 / 25132²
//! den = 128
//! ```
//!
//! Evaluated entirely in `u128`; no intermediate value exceeds 2^60.
//!
//! ## Sinusoidal (legacy)
//!
//! ```text
//! h(x) = 15 * sin((x + 12000π) / 8000) + 15 + 1,   x = min(elapsed, 8000π)
//! ```
//!
//! Evaluated in `f64` and quantized by rounding to a denominator of 2^20,
//! then clamped to `[1, 31]`. The quantized numerator is what the policy
//! compares against, so the decision stays integer-exact.

use std::cmp::Ordering;
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Cubic curve denominator.
pub const CUBIC_DENOMINATOR: u64 = 128;
/// Elapsed seconds after which the cubic curve is flat (⌊8000π⌋).
pub const CUBIC_XCAP: u64 = 25_132;
/// Half the rise of either curve, in units of the baseline.
pub const AMPLITUDE: u64 = 15;
/// Cubic rise from floor to ceiling, in denominator units.
pub const CUBIC_HEIGHT: u64 = CUBIC_DENOMINATOR * 2 * AMPLITUDE;
/// Fixed-point denominator used to quantize the sinusoid.
pub const SINUSOIDAL_DENOMINATOR: u64 = 1 << 20;

/// A non-negative rational `numerator / denominator`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurveValue {
    /// Scaled required ratio.
    pub numerator: u64,
    /// Scale; never zero for values produced by a curve.
    pub denominator: u64,
}

impl CurveValue {
    /// Lossy value for logs and tables.
    pub fn as_f64(&self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Compare by value rather than by representation.
    pub fn cmp_value(&self, other: &CurveValue) -> Ordering {
        let lhs = u128::from(self.numerator) * u128::from(other.denominator);
        let rhs = u128::from(other.numerator) * u128::from(self.denominator);
        lhs.cmp(&rhs)
    }

    /// Whether the value is exactly 1.
    pub fn is_unity(&self) -> bool {
        self.numerator == self.denominator
    }
}

impl fmt::Display for CurveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} (~{:.4})", self.numerator, self.denominator, self.as_f64())
    }
}

/// The active penalty curve family. Selected once, at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyCurve {
    /// Cubic polynomial with exact integer evaluation.
    #[default]
    Cubic,
    /// Legacy sinusoid, quantized to 2^-20.
    Sinusoidal,
}

impl PenaltyCurve {
    /// All curve families.
    pub const ALL: [PenaltyCurve; 2] = [PenaltyCurve::Cubic, PenaltyCurve::Sinusoidal];

    /// Denominator of every value this curve returns.
    pub const fn denominator(self) -> u64 {
        match self {
            PenaltyCurve::Cubic => CUBIC_DENOMINATOR,
            PenaltyCurve::Sinusoidal => SINUSOIDAL_DENOMINATOR,
        }
    }

    /// Required ratio after `elapsed` seconds.
    pub fn evaluate(self, elapsed: u64) -> CurveValue {
        let numerator = match self {
            PenaltyCurve::Cubic => cubic_numerator(elapsed),
            PenaltyCurve::Sinusoidal => sinusoidal_numerator(elapsed),
        };
        CurveValue {
            numerator,
            denominator: self.denominator(),
        }
    }

    /// Value at zero elapsed time: exactly 1.
    pub fn floor(self) -> CurveValue {
        self.evaluate(0)
    }

    /// Saturated value: exactly 31.
    pub fn ceiling(self) -> CurveValue {
        CurveValue {
            numerator: self.denominator() * (2 * AMPLITUDE + 1),
            denominator: self.denominator(),
        }
    }

    /// Stable lowercase name, as used in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            PenaltyCurve::Cubic => "cubic",
            PenaltyCurve::Sinusoidal => "sinusoidal",
        }
    }
}

impl fmt::Display for PenaltyCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized curve name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown penalty curve {0:?} (expected \"cubic\" or \"sinusoidal\")")]
pub struct UnknownCurve(pub String);

impl FromStr for PenaltyCurve {
    type Err = UnknownCurve;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cubic" | "polynomial" => Ok(PenaltyCurve::Cubic),
            "sinusoidal" | "sin" | "legacy" => Ok(PenaltyCurve::Sinusoidal),
            _ => Err(UnknownCurve(s.to_string())),
        }
    }
}

fn cubic_numerator(elapsed: u64) -> u64 {
    let x = u128::from(elapsed.min(CUBIC_XCAP));
    let xcap = u128::from(CUBIC_XCAP);
    // 3x² >= 2x³/xcap whenever x <= xcap.
    let shape = 3 * x * x - (2 * x * x * x) / xcap;
    let rise = shape * u128::from(CUBIC_HEIGHT) / (xcap * xcap);
    // rise <= CUBIC_HEIGHT, so the narrowing cannot truncate.
    CUBIC_DENOMINATOR + rise as u64
}

/// Unquantized legacy sinusoid. Display and diagnostics only.
pub fn sinusoidal_f64(elapsed: f64) -> f64 {
    let x = elapsed.clamp(0.0, 8000.0 * PI);
    AMPLITUDE as f64 * ((x + 12_000.0 * PI) / 8000.0).sin() + AMPLITUDE as f64 + 1.0
}

fn sinusoidal_numerator(elapsed: u64) -> u64 {
    let scaled = (sinusoidal_f64(elapsed as f64) * SINUSOIDAL_DENOMINATOR as f64).round();
    let lo = SINUSOIDAL_DENOMINATOR as f64;
    let hi = (SINUSOIDAL_DENOMINATOR * (2 * AMPLITUDE + 1)) as f64;
    scaled.clamp(lo, hi) as u64
}
