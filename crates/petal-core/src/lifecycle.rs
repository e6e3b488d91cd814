//! # Order Lifecycle
//!
//! Order statuses and the one edge this engine drives.
//!
//! ## State Machine
//! ```text
//!                ┌────────── request Confirmed ──────────┐
//!                │   service: check stock, deduct,       │
//!                │   mark bouquets sold, audit           │
//!                │                                       ▼
//!          ┌─────────┐                             ┌───────────┐
//!          │  Draft  │                             │ Confirmed │──► In progress ──► ...
//!          └─────────┘                             └───────────┘    (service-owned)
//!                ▲                                       │
//!                │   service: return stock,              │
//!                │   unmark bouquets                     │
//!                └─────────── request Draft ─────────────┘
//! ```
//!
//! The engine asks; the order service decides. A rejected request leaves
//! the local status where it was and carries the service's reason verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Status
// =============================================================================

/// Every status an order can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Draft,
    Created,
    Confirmed,
    #[serde(rename = "In progress")]
    InProgress,
    #[serde(rename = "In delivery")]
    InDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::Draft,
        OrderStatus::Created,
        OrderStatus::Confirmed,
        OrderStatus::InProgress,
        OrderStatus::InDelivery,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "Draft",
            OrderStatus::Created => "Created",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::InProgress => "In progress",
            OrderStatus::InDelivery => "In delivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Statuses this engine may request, and create an order in.
    pub fn is_engine_managed(&self) -> bool {
        matches!(self, OrderStatus::Draft | OrderStatus::Confirmed)
    }

    /// True once stock has been taken for the order.
    pub fn holds_inventory(&self) -> bool {
        matches!(
            self,
            OrderStatus::Confirmed
                | OrderStatus::InProgress
                | OrderStatus::InDelivery
                | OrderStatus::Delivered
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::UnknownVariant {
                kind: "order status",
                value: s.to_string(),
            })
    }
}

// =============================================================================
// Transitions
// =============================================================================

/// What the order service does to inventory when a transition is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InventoryEffect {
    /// Take stock for counted lines, mark bouquets sold. All or nothing.
    Deduct,
    /// Return stock, unmark bouquets. One compensating operation.
    Restore,
}

/// A requested status change, validated locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl StatusTransition {
    pub fn effect(&self) -> InventoryEffect {
        match self.to {
            OrderStatus::Confirmed => InventoryEffect::Deduct,
            _ => InventoryEffect::Restore,
        }
    }
}

/// Checks that `from → to` is an edge this engine may request.
///
/// ## Errors
/// - `InvalidTransition` when `to == from`
/// - `InvalidTransition` for anything but Draft ⇄ Confirmed
pub fn plan_transition(from: OrderStatus, to: OrderStatus) -> CoreResult<StatusTransition> {
    let invalid = |reason: &str| CoreError::InvalidTransition {
        from: from.to_string(),
        to: to.to_string(),
        reason: reason.to_string(),
    };

    if from == to {
        return Err(invalid("New status is the same as current status"));
    }
    match (from, to) {
        (OrderStatus::Draft, OrderStatus::Confirmed) | (OrderStatus::Confirmed, OrderStatus::Draft) => {
            Ok(StatusTransition { from, to })
        }
        _ => Err(invalid("this change is made by the order service")),
    }
}

/// The order service's answer to a transition request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    Accepted {
        previous_status: OrderStatus,
        new_status: OrderStatus,
    },
    Rejected {
        reason: String,
    },
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Local view of an order's status with at most one request in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderLifecycle {
    status: OrderStatus,
    pending: Option<StatusTransition>,
}

impl OrderLifecycle {
    pub fn new(status: OrderStatus) -> Self {
        OrderLifecycle {
            status,
            pending: None,
        }
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn pending(&self) -> Option<StatusTransition> {
        self.pending
    }

    /// Starts a request for `target`. The status does not change yet.
    pub fn begin(&mut self, target: OrderStatus) -> CoreResult<StatusTransition> {
        if let Some(pending) = self.pending {
            return Err(CoreError::InvalidTransition {
                from: self.status.to_string(),
                to: target.to_string(),
                reason: format!("a change to {} is already pending", pending.to),
            });
        }
        let transition = plan_transition(self.status, target)?;
        self.pending = Some(transition);
        Ok(transition)
    }

    /// Applies the service's answer.
    ///
    /// Accepted moves to the status the service reports. Rejected keeps the
    /// prior status and returns `TransitionRejected` with the reason as sent.
    pub fn resolve(&mut self, outcome: TransitionOutcome) -> CoreResult<OrderStatus> {
        let transition = self.pending.take().ok_or(CoreError::NoPendingTransition)?;

        match outcome {
            TransitionOutcome::Accepted { new_status, .. } => {
                info!(from = %transition.from, to = %new_status, "Status change accepted");
                self.status = new_status;
                Ok(new_status)
            }
            TransitionOutcome::Rejected { reason } => {
                warn!(from = %transition.from, to = %transition.to, %reason, "Status change rejected");
                Err(CoreError::TransitionRejected {
                    to: transition.to.to_string(),
                    reason,
                })
            }
        }
    }

    /// Drops a pending request whose outcome will never arrive.
    pub fn abandon(&mut self) -> Option<StatusTransition> {
        self.pending.take()
    }
}

// =============================================================================
// Tests
// =============================================================================
