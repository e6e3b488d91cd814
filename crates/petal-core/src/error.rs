//! # Error Types
//!
//! Domain-specific error types for petal-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  petal-core errors (this file)                                         │
//! │  ├── CoreError        - Rejected cart mutations, bad transitions       │
//! │  └── ValidationError  - Pre-submission field checks                    │
//! │                                                                         │
//! │  petal-client errors (separate crate)                                  │
//! │  └── ClientError      - Transport, server rejections, partial saves    │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ClientError → caller              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A rejected mutation never changes the cart. Callers can surface the
//! error and keep working with the previous state.

use thiserror::Error;

/// Result alias for engine operations.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the cart, stock guard and lifecycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// There is no line for this item in the cart.
    #[error("Item not in cart: {0}")]
    LineNotFound(String),

    /// Requested quantity is above the last known balance.
    ///
    /// ## User Workflow
    /// ```text
    /// Tap "+" on Rose (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=5
    ///      │
    ///      ▼
    /// InsufficientStock { item_id: "f1", name: "Rose (red)", available: 5, requested: 6 }
    ///      │
    ///      ▼
    /// Line stays at 5, UI shows: "Only 5 available"
    /// ```
    #[error("Insufficient stock for {name}: available {available}, requested {requested}")]
    InsufficientStock {
        item_id: String,
        name: String,
        available: u32,
        requested: u32,
    },

    /// Bouquets are single instances; their quantity is always 1.
    #[error("Bouquet {item_id} is a single instance, quantity is fixed at 1")]
    BouquetQuantityPinned { item_id: String },

    /// The engine only drives Draft ⇄ Confirmed, and never to the same status.
    #[error("Cannot change status from {from} to {to}: {reason}")]
    InvalidTransition {
        from: String,
        to: String,
        reason: String,
    },

    /// The order service refused a status change. The reason is its own text.
    #[error("Status change to {to} rejected: {reason}")]
    TransitionRejected { to: String, reason: String },

    /// A transition outcome arrived with no request pending.
    #[error("No status change is pending")]
    NoPendingTransition,

    /// Unrecognised value coming from the order service.
    #[error("Unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// True for errors caused by stock limits, either the quantity guard or
    /// a server-side confirm rejection.
    pub fn is_stock_related(&self) -> bool {
        matches!(
            self,
            CoreError::InsufficientStock { .. }
                | CoreError::TransitionRejected { .. }
                | CoreError::Validation(ValidationError::ExceedsStock { .. })
        )
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any network call; a submission that fails validation is
/// never sent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., malformed date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Nothing to submit.
    #[error("Order must contain at least one item")]
    EmptyCart,

    /// A line asks for more than the last fetched balance.
    #[error("{name}: requested {requested}, only {available} available")]
    ExceedsStock {
        name: String,
        requested: u32,
        available: u32,
    },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            item_id: "f1".into(),
            name: "Rose (red)".into(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Rose (red): available 3, requested 5"
        );

        let err = ValidationError::required("Client");
        assert_eq!(err.to_string(), "Client is required");
    }

    #[test]
    fn test_validation_wraps_into_core() {
        let err: CoreError = ValidationError::EmptyCart.into();
        assert!(matches!(err, CoreError::Validation(ValidationError::EmptyCart)));
        assert!(!err.is_stock_related());
    }

    #[test]
    fn test_stock_related() {
        let rejected = CoreError::TransitionRejected {
            to: "Confirmed".into(),
            reason: "Not enough Rose".into(),
        };
        assert!(rejected.is_stock_related());

        let exceeds: CoreError = ValidationError::ExceedsStock {
            name: "Rose".into(),
            requested: 4,
            available: 2,
        }
        .into();
        assert!(exceeds.is_stock_related());
    }
}
