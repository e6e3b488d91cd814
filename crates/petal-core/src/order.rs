//! # Order Details
//!
//! Order-level fields that sit next to the cart: client, delivery and
//! payment. Prices live in the [`CartStore`](crate::cart::CartStore).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::cart::CartStore;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::lifecycle::OrderStatus;
use crate::pricing::OrderTotals;
use crate::stock::StockLevels;
use crate::validation::{validate_for_create, ValidationResult};

// =============================================================================
// Delivery
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeliveryType {
    #[default]
    Pickup,
    Delivery,
}

impl fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryType::Pickup => write!(f, "Pickup"),
            DeliveryType::Delivery => write!(f, "Delivery"),
        }
    }
}

impl FromStr for DeliveryType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Pickup" => Ok(DeliveryType::Pickup),
            "Delivery" => Ok(DeliveryType::Delivery),
            other => Err(CoreError::UnknownVariant {
                kind: "delivery type",
                value: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// Payment
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Pending" => Ok(PaymentStatus::Pending),
            "Paid" => Ok(PaymentStatus::Paid),
            "Refunded" => Ok(PaymentStatus::Refunded),
            other => Err(CoreError::UnknownVariant {
                kind: "payment status",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    Cash,
    Card,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    Other,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::Cash => write!(f, "Cash"),
            PaymentMethod::Card => write!(f, "Card"),
            PaymentMethod::BankTransfer => write!(f, "Bank Transfer"),
            PaymentMethod::Other => write!(f, "Other"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Cash" => Ok(PaymentMethod::Cash),
            "Card" => Ok(PaymentMethod::Card),
            "Bank Transfer" => Ok(PaymentMethod::BankTransfer),
            "Other" => Ok(PaymentMethod::Other),
            other => Err(CoreError::UnknownVariant {
                kind: "payment method",
                value: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// Order Details
// =============================================================================

/// Client, delivery and payment fields of an order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderDetails {
    pub client_id: Option<String>,
    #[serde(default)]
    pub delivery_type: DeliveryType,
    pub delivery_address: Option<String>,
    /// Free-form local date-time as entered (`2026-05-01T14:30`).
    pub delivery_date_time: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    pub payment_method: Option<PaymentMethod>,
}

impl OrderDetails {
    /// Address to send: only for deliveries, blank treated as absent.
    pub fn effective_address(&self) -> Option<&str> {
        match self.delivery_type {
            DeliveryType::Delivery => non_blank(self.delivery_address.as_deref()),
            DeliveryType::Pickup => None,
        }
    }

    /// Payment method to send: only once the order is paid.
    pub fn effective_payment_method(&self) -> Option<PaymentMethod> {
        match self.payment_status {
            PaymentStatus::Paid => self.payment_method,
            _ => None,
        }
    }

    pub fn client(&self) -> Option<&str> {
        non_blank(self.client_id.as_deref())
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

// =============================================================================
// Order Draft
// =============================================================================

/// A new order being composed, not yet sent.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub details: OrderDetails,
    pub store: CartStore,
    location_id: Option<String>,
    status: OrderStatus,
}

impl OrderDraft {
    /// Starts an empty draft against the stock of one location.
    ///
    /// New orders are created Confirmed unless [`OrderDraft::set_status`]
    /// says otherwise.
    pub fn new(stock: StockLevels) -> Self {
        let location_id = stock.location_id().map(str::to_string);
        OrderDraft {
            details: OrderDetails::default(),
            store: CartStore::new(stock),
            location_id,
            status: OrderStatus::Confirmed,
        }
    }

    /// Creation only accepts Draft or Confirmed.
    pub fn set_status(&mut self, status: OrderStatus) -> CoreResult<()> {
        if !status.is_engine_managed() {
            return Err(ValidationError::InvalidFormat {
                field: "Order status".into(),
                reason: format!("a new order cannot start as {}", status),
            }
            .into());
        }
        self.status = status;
        Ok(())
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn location_id(&self) -> Option<&str> {
        self.location_id.as_deref()
    }

    pub fn totals(&self) -> OrderTotals {
        self.store.totals()
    }

    /// Every pre-submission check, in order.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_for_create(
            &self.details,
            self.store.cart(),
            self.store.stock(),
            self.location_id(),
        )
    }
}

// =============================================================================
// Tests
// =============================================================================
