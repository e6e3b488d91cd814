//! # Money Module
//!
//! Decimal money for prices, line subtotals and order totals.
//!
//! ## Why Decimal?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  f64:      2.00 × 1.20 = 2.4000000000000004                            │
//! │  Decimal:  2.00 × 1.20 = 2.4000                                        │
//! │                                                                         │
//! │  Markups are recomputed from the standard price on every change, so    │
//! │  nothing compounds. Rounding to 2 places happens only at the edges:    │
//! │                                                                         │
//! │     compute (full precision) ──► rounded() ──► Display / wire          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! On the wire money is a JSON number (`2.4`), matching what the order
//! service stores. Callers round before building a request.

use rust_decimal::prelude::*;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

/// Presentation precision for money.
pub const DECIMAL_PLACES: u32 = 2;

/// A monetary amount in the shop's single currency.
///
/// Keeps full `Decimal` precision internally. Use [`Money::rounded`] for
/// anything a person or the order service will see.
///
/// ## Example
/// ```rust
/// use petal_core::money::Money;
///
/// let price = Money::from_cents(299);
/// assert_eq!(price.to_string(), "2.99");
/// assert_eq!((price * 3).to_string(), "8.97");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Money {
    /// Creates money from minor units (cents).
    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, DECIMAL_PLACES))
    }

    /// Wraps an existing decimal without rounding.
    pub const fn from_decimal(value: Decimal) -> Self {
        Money(value)
    }

    /// Converts a float coming from a loosely typed source.
    ///
    /// Returns `None` for NaN and infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Decimal::from_f64(value).map(Money)
    }

    /// Zero.
    pub const fn zero() -> Self {
        Money(Decimal::ZERO)
    }

    /// The underlying decimal value.
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Rounds to 2 decimal places, half away from zero.
    ///
    /// ```rust
    /// use petal_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let m = Money::from_decimal(Decimal::new(2345, 3)); // 2.345
    /// assert_eq!(m.rounded(), Money::from_cents(235));
    /// ```
    pub fn rounded(&self) -> Self {
        Money(
            self.0
                .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Clamps negative amounts to zero.
    pub fn non_negative(self) -> Self {
        if self.is_negative() {
            Money::zero()
        } else {
            self
        }
    }

    /// Multiplies by a line quantity.
    pub fn multiply_quantity(&self, qty: u32) -> Self {
        Money(self.0 * Decimal::from(qty))
    }

    /// Returns `pct` percent of this amount, unrounded.
    ///
    /// ```rust
    /// use petal_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let subtotal = Money::from_cents(3100);
    /// assert_eq!(subtotal.percent(Decimal::from(10)), Money::from_cents(310));
    /// ```
    pub fn percent(&self, pct: Decimal) -> Self {
        Money(self.0 * pct / Decimal::ONE_HUNDRED)
    }

    /// Scales by `(1 + pct / 100)`, unrounded.
    pub fn scale_by_percent(&self, pct: Decimal) -> Self {
        Money(self.0 * (Decimal::ONE + pct / Decimal::ONE_HUNDRED))
    }
}

/// Always prints exactly two decimals: `31.00`, `2.40`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut value = self.rounded().0;
        value.rescale(DECIMAL_PLACES);
        write!(f, "{}", value)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Money(value)
    }
}

// =============================================================================
// Arithmetic Operations
// =============================================================================

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    fn mul(self, qty: u32) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Tests
// =============================================================================
