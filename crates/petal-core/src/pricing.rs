//! # Pricing Calculator
//!
//! Line prices from standard price and markup, and order totals from lines,
//! discount and delivery.
//!
//! ## Line Price
//! ```text
//!   standard_price ──┬── markup None ─────────────► actual = standard
//!                    │
//!                    └── markup m ∈ [-100, 100] ──► actual = max(0, standard × (1 + m/100))
//!
//!   manual price p ─────────────────────────────► actual = max(0, p), markup = None
//! ```
//!
//! Markup always starts from the standard price, never from the previous
//! actual price. Markup and manual price are two views of the same field;
//! the last call wins.
//!
//! ## Order Totals
//! ```text
//!   subtotal        = Σ quantity × actual_price
//!   discount_amount = subtotal × discount% / 100
//!   total           = subtotal + delivery_price − discount_amount
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, ValidationError};
use crate::item::LineItem;
use crate::money::Money;

// =============================================================================
// Markup
// =============================================================================

/// Signed per-line markup percentage in [-100, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Markup(i32);

impl Markup {
    pub const MIN: i32 = -100;
    pub const MAX: i32 = 100;

    /// Validates a markup percentage.
    ///
    /// ## Errors
    /// - `OutOfRange` outside [-100, 100]
    pub fn new(percent: i32) -> CoreResult<Self> {
        if !(Self::MIN..=Self::MAX).contains(&percent) {
            return Err(ValidationError::OutOfRange {
                field: "markup".into(),
                min: Self::MIN as i64,
                max: Self::MAX as i64,
            }
            .into());
        }
        Ok(Markup(percent))
    }

    /// Clamps into range instead of failing, as the markup field does.
    pub fn clamped(percent: i32) -> Self {
        Markup(percent.clamp(Self::MIN, Self::MAX))
    }

    pub fn percent(&self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for Markup {
    type Error = crate::error::CoreError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Markup::new(value)
    }
}

impl From<Markup> for i32 {
    fn from(m: Markup) -> Self {
        m.0
    }
}

// =============================================================================
// Discount
// =============================================================================

/// Order-level discount percentage, clamped to [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Discount(#[serde(with = "rust_decimal::serde::float")] Decimal);

impl Discount {
    /// Clamps `percent` into [0, 100].
    pub fn new(percent: Decimal) -> Self {
        Discount(percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED))
    }

    pub fn from_percent(percent: u32) -> Self {
        Discount::new(Decimal::from(percent))
    }

    pub fn none() -> Self {
        Discount(Decimal::ZERO)
    }

    pub fn percent(&self) -> Decimal {
        self.0
    }
}

// =============================================================================
// Line Pricing
// =============================================================================

/// Effective unit price for a standard price and optional markup.
///
/// ```rust
/// use petal_core::money::Money;
/// use petal_core::pricing::{price_line, Markup};
///
/// let standard = Money::from_cents(200);
/// assert_eq!(price_line(standard, Some(Markup::clamped(20))), Money::from_cents(240));
/// assert_eq!(price_line(standard, None), standard);
/// ```
pub fn price_line(standard_price: Money, markup: Option<Markup>) -> Money {
    match markup {
        None => standard_price,
        Some(m) => standard_price
            .scale_by_percent(Decimal::from(m.percent()))
            .non_negative(),
    }
}

impl LineItem {
    /// Sets or clears the markup and recomputes the actual price from the
    /// standard price.
    pub(crate) fn apply_markup(&mut self, markup: Option<Markup>) {
        self.markup = markup;
        self.actual_price = price_line(self.standard_price, markup);
    }

    /// Manual price edit: clamps at zero and clears any markup.
    pub(crate) fn override_price(&mut self, price: Money) {
        self.markup = None;
        self.actual_price = price.non_negative();
    }
}

// =============================================================================
// Order Totals
// =============================================================================

/// Derived order amounts. Never stored on their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub delivery_price: Money,
    pub total: Money,
    /// Subtotal at standard prices, before markups and overrides.
    pub standard_subtotal: Money,
}

impl OrderTotals {
    /// Every amount rounded to 2 places, for display and the wire.
    pub fn rounded(&self) -> Self {
        OrderTotals {
            subtotal: self.subtotal.rounded(),
            discount_amount: self.discount_amount.rounded(),
            delivery_price: self.delivery_price.rounded(),
            total: self.total.rounded(),
            standard_subtotal: self.standard_subtotal.rounded(),
        }
    }
}

/// Computes order totals at full precision.
///
/// `delivery_price` is clamped at zero; the discount is already clamped by
/// construction.
pub fn price_order<'a, I>(lines: I, discount: Discount, delivery_price: Money) -> OrderTotals
where
    I: IntoIterator<Item = &'a LineItem>,
{
    let mut subtotal = Money::zero();
    let mut standard_subtotal = Money::zero();
    for line in lines {
        subtotal += line.line_total();
        standard_subtotal += line.standard_price().multiply_quantity(line.quantity());
    }

    let delivery_price = delivery_price.non_negative();
    let discount_amount = subtotal.percent(discount.percent());

    OrderTotals {
        subtotal,
        discount_amount,
        delivery_price,
        total: subtotal + delivery_price - discount_amount,
        standard_subtotal,
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemType;

    fn rose() -> LineItem {
        LineItem::new("f1", ItemType::Flower, "Rose", Money::from_cents(200), 3).unwrap()
    }

    #[test]
    fn test_price_line_without_markup() {
        for cents in [0, 1, 200, 12345] {
            let p = Money::from_cents(cents);
            assert_eq!(price_line(p, None), p);
        }
    }

    #[test]
    fn test_price_line_matches_formula() {
        let p = Money::from_cents(1999);
        for m in [-100, -50, -1, 0, 5, 10, 25, 50, 100] {
            let expected = Money::from_decimal(
                p.as_decimal() * (Decimal::ONE + Decimal::from(m) / Decimal::ONE_HUNDRED),
            )
            .non_negative();
            assert_eq!(price_line(p, Some(Markup::clamped(m))), expected, "markup {m}");
        }
        assert_eq!(price_line(p, Some(Markup::clamped(-100))), Money::zero());
    }

    #[test]
    fn test_markup_range() {
        assert!(Markup::new(100).is_ok());
        assert!(Markup::new(-100).is_ok());
        assert!(Markup::new(101).is_err());
        assert!(Markup::new(-101).is_err());
        assert_eq!(Markup::clamped(250).percent(), 100);
        assert_eq!(Markup::clamped(-250).percent(), -100);
    }

    #[test]
    fn test_markup_does_not_compound() {
        let mut line = rose();
        line.apply_markup(Some(Markup::clamped(20)));
        line.apply_markup(Some(Markup::clamped(20)));
        assert_eq!(line.actual_price(), Money::from_cents(240));

        line.apply_markup(None);
        assert_eq!(line.actual_price(), line.standard_price());
    }

    #[test]
    fn test_override_clears_markup() {
        let mut line = rose();
        line.apply_markup(Some(Markup::clamped(50)));
        line.override_price(Money::from_cents(175));
        assert_eq!(line.markup(), None);
        assert_eq!(line.actual_price(), Money::from_cents(175));

        line.override_price(Money::from_cents(-10));
        assert_eq!(line.actual_price(), Money::zero());

        // markup after override starts again from the standard price
        line.apply_markup(Some(Markup::clamped(10)));
        assert_eq!(line.actual_price(), Money::from_cents(220));
    }

    #[test]
    fn test_discount_clamped() {
        assert_eq!(Discount::new(Decimal::from(150)).percent(), Decimal::ONE_HUNDRED);
        assert_eq!(Discount::new(Decimal::from(-5)).percent(), Decimal::ZERO);
        assert_eq!(Discount::from_percent(15).percent(), Decimal::from(15));
    }

    #[test]
    fn test_price_order() {
        let lines = vec![
            rose(),
            LineItem::new("b1", ItemType::Bouquet, "Spring", Money::from_cents(2500), 1).unwrap(),
        ];
        let totals = price_order(&lines, Discount::from_percent(10), Money::from_cents(500));

        assert_eq!(totals.subtotal, Money::from_cents(3100));
        assert_eq!(totals.discount_amount, Money::from_cents(310));
        assert_eq!(totals.delivery_price, Money::from_cents(500));
        assert_eq!(totals.total, Money::from_cents(3290));
        assert_eq!(totals.standard_subtotal, Money::from_cents(3100));
    }

    #[test]
    fn test_price_order_clamps_delivery_and_keeps_precision() {
        let mut line = LineItem::new("f1", ItemType::Flower, "Rose", Money::from_cents(333), 1).unwrap();
        line.apply_markup(Some(Markup::clamped(5)));

        let totals = price_order([&line], Discount::none(), Money::from_cents(-300));
        assert_eq!(totals.delivery_price, Money::zero());
        // 3.33 × 1.05 = 3.4965 until presentation
        assert_eq!(totals.subtotal.as_decimal(), Decimal::new(34965, 4));
        assert_eq!(totals.rounded().subtotal, Money::from_cents(350));
    }

    #[test]
    fn test_empty_order() {
        let totals = price_order(std::iter::empty(), Discount::from_percent(25), Money::from_cents(500));
        assert_eq!(totals.subtotal, Money::zero());
        assert_eq!(totals.total, Money::from_cents(500));
    }

    #[test]
    fn test_markup_serde() {
        let json = serde_json::to_string(&Markup::clamped(-20)).unwrap();
        assert_eq!(json, "-20");
        assert!(serde_json::from_str::<Markup>("120").is_err());
    }
}
