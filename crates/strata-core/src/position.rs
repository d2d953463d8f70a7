//! Signed position quantity.
//!
//! Uses `rust_decimal` for exact decimal arithmetic, so aggregated strategy
//! positions compare equal to portfolio positions without rounding noise.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Neg, Sub};

/// Signed quantity held in one instrument.
///
/// Positive is long, negative is short, zero is flat. Combining positions
/// (`aggregate`, `+`, `Sum`) is associative and commutative with `FLAT` as
/// the neutral element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(pub Decimal);

impl Position {
    pub const FLAT: Self = Self(Decimal::ZERO);

    #[inline]
    pub fn new(quantity: Decimal) -> Self {
        Self(quantity)
    }

    #[inline]
    pub fn inner(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_flat(&self) -> bool {
        self.0.is_zero()
    }

    #[inline]
    pub fn is_long(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    #[inline]
    pub fn is_short(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Combine two positions held in the same instrument.
    #[inline]
    #[must_use]
    pub fn aggregate(self, other: Self) -> Self {
        Self(self.0 + other.0)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::FLAT
    }
}

impl From<Decimal> for Position {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<i64> for Position {
    fn from(value: i64) -> Self {
        Self(Decimal::from(value))
    }
}

impl Add for Position {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        self.aggregate(rhs)
    }
}

impl Sub for Position {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Neg for Position {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(-self.0)
    }
}

impl Sum for Position {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::FLAT, Position::aggregate)
    }
}

impl<'a> Sum<&'a Position> for Position {
    fn sum<I: Iterator<Item = &'a Position>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
