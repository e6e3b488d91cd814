//! # Validation Module
//!
//! Checks run before an order is submitted.
//!
//! ## Validation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. client selected                                                     │
//! │  2. delivery address present        (only when delivery type=Delivery)  │
//! │  3. delivery date/time parses       (only when given)                   │
//! │  4. cart not empty                                                      │
//! │  5. shop location selected          (create only)                       │
//! │  6. every counted line ≤ known stock                                    │
//! │                                                                         │
//! │  First failure wins. Nothing is sent while any check fails.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The stock check only catches what the client already knows. The order
//! service validates again when the order is confirmed.

use chrono::{DateTime, NaiveDateTime};

use crate::cart::Cart;
use crate::error::ValidationError;
use crate::item::LineItem;
use crate::order::{non_blank, DeliveryType, OrderDetails};
use crate::stock::{StockGuard, StockLevels};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Accepted shapes for a delivery date/time.
const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

// =============================================================================
// Field Validators
// =============================================================================

/// A client must be selected.
pub fn validate_client(details: &OrderDetails) -> ValidationResult<()> {
    match details.client() {
        Some(_) => Ok(()),
        None => Err(ValidationError::required("Client")),
    }
}

/// Deliveries need an address; pickups do not.
pub fn validate_delivery(details: &OrderDetails) -> ValidationResult<()> {
    if details.delivery_type == DeliveryType::Delivery && details.effective_address().is_none() {
        return Err(ValidationError::required("Delivery address"));
    }
    Ok(())
}

/// When a delivery date/time is given it must parse.
///
/// ```rust
/// use petal_core::validation::validate_date_time;
///
/// assert!(validate_date_time("2026-05-01T14:30").is_ok());
/// assert!(validate_date_time("2026-05-01T14:30:00+02:00").is_ok());
/// assert!(validate_date_time("tomorrow").is_err());
/// ```
pub fn validate_date_time(value: &str) -> ValidationResult<()> {
    let value = value.trim();
    let parses = DATE_TIME_FORMATS
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
        || DateTime::parse_from_rfc3339(value).is_ok();

    if parses {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: "Delivery date/time".into(),
            reason: format!("cannot read '{}' as a date and time", value),
        })
    }
}

pub fn validate_cart(cart: &Cart) -> ValidationResult<()> {
    if cart.is_empty() {
        return Err(ValidationError::EmptyCart);
    }
    Ok(())
}

pub fn validate_location(location_id: Option<&str>) -> ValidationResult<()> {
    match non_blank(location_id) {
        Some(_) => Ok(()),
        None => Err(ValidationError::required("Shop location")),
    }
}

/// Every counted line must fit the last known balance.
pub fn validate_stock<'a, I>(lines: I, stock: &StockLevels) -> ValidationResult<()>
where
    I: IntoIterator<Item = &'a LineItem>,
{
    match StockGuard::find_conflicts(lines, stock).into_iter().next() {
        Some(conflict) => Err(ValidationError::ExceedsStock {
            name: conflict.name,
            requested: conflict.requested,
            available: conflict.available,
        }),
        None => Ok(()),
    }
}

// =============================================================================
// Composite Validators
// =============================================================================

fn validate_fields(details: &OrderDetails, cart: &Cart) -> ValidationResult<()> {
    validate_client(details)?;
    validate_delivery(details)?;
    if let Some(when) = non_blank(details.delivery_date_time.as_deref()) {
        validate_date_time(when)?;
    }
    validate_cart(cart)
}

/// Checks shared by create and save.
pub fn validate_order(details: &OrderDetails, cart: &Cart, stock: &StockLevels) -> ValidationResult<()> {
    validate_fields(details, cart)?;
    validate_stock(cart.lines(), stock)
}

/// Full pre-create check, including the shop location.
pub fn validate_for_create(
    details: &OrderDetails,
    cart: &Cart,
    stock: &StockLevels,
    location_id: Option<&str>,
) -> ValidationResult<()> {
    validate_fields(details, cart)?;
    validate_location(location_id)?;
    validate_stock(cart.lines(), stock)
}

// =============================================================================
// Tests
// =============================================================================
