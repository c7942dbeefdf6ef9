//! # Difficulty — Arbitrary-Precision Work Measure
//!
//! `Difficulty` is used both for a single header's difficulty and for
//! cumulative total difficulty. It wraps `BigUint` so that totals over long
//! chains, multiplied by penalty-curve numerators, never overflow and never
//! lose precision.
//!
//! ## Serialization
//!
//! Serializes as a decimal string (`"131072"`) so values above 2^53 survive
//! JSON consumers that parse numbers as doubles.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;

use num_bigint::BigUint;
use num_traits::{CheckedSub, ToPrimitive, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Unsigned arbitrary-precision difficulty or total difficulty.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Difficulty(BigUint);

impl Difficulty {
    /// Zero difficulty.
    pub fn zero() -> Self {
        Self(BigUint::zero())
    }

    /// Whether the value is zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Borrow the underlying big integer.
    pub fn as_biguint(&self) -> &BigUint {
        &self.0
    }

    /// Consume into the underlying big integer.
    pub fn into_biguint(self) -> BigUint {
        self.0
    }

    /// `self - other`, or `None` if `other > self`.
    pub fn checked_sub(&self, other: &Self) -> Option<Self> {
        self.0.checked_sub(&other.0).map(Self)
    }

    /// Lossy conversion for display and diagnostics only.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(f64::INFINITY)
    }

    /// Exact conversion when the value fits in 64 bits.
    pub fn to_u64(&self) -> Option<u64> {
        self.0.to_u64()
    }
}

impl From<u64> for Difficulty {
    fn from(value: u64) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<u128> for Difficulty {
    fn from(value: u128) -> Self {
        Self(BigUint::from(value))
    }
}

impl From<BigUint> for Difficulty {
    fn from(value: BigUint) -> Self {
        Self(value)
    }
}

impl Add<&Difficulty> for &Difficulty {
    type Output = Difficulty;

    fn add(self, rhs: &Difficulty) -> Difficulty {
        Difficulty(&self.0 + &rhs.0)
    }
}

impl Add for Difficulty {
    type Output = Difficulty;

    fn add(self, rhs: Difficulty) -> Difficulty {
        Difficulty(self.0 + rhs.0)
    }
}

impl AddAssign<&Difficulty> for Difficulty {
    fn add_assign(&mut self, rhs: &Difficulty) {
        self.0 += &rhs.0;
    }
}

impl<'a> Sum<&'a Difficulty> for Difficulty {
    fn sum<I: Iterator<Item = &'a Difficulty>>(iter: I) -> Self {
        iter.fold(Difficulty::zero(), |mut acc, d| {
            acc += d;
            acc
        })
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Difficulty({})", self.0)
    }
}

impl FromStr for Difficulty {
    type Err = num_bigint::ParseBigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<BigUint>().map(Self)
    }
}

impl Serialize for Difficulty {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
