//! Order status enumeration.

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// Orders are created as [`Created`](Self::Created); `Pending` exists for
/// legacy rows that predate the checkout orchestrator and is never assigned
/// by new code. Administrators may move an order between any of the five
/// meaningful states; `Delivered` and `Cancelled` are terminal by
/// convention, not enforcement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Legacy initial state, superseded by `Created`.
    #[default]
    Pending,
    /// Order persisted and stock debited; payment not yet confirmed.
    Created,
    /// Payment confirmed by the gateway callback.
    Paid,
    /// Handed to the carrier.
    Shipped,
    /// Received by the customer. Terminal by convention.
    Delivered,
    /// Cancelled by an administrator. Terminal by convention.
    Cancelled,
}

impl OrderStatus {
    /// All statuses an administrator may assign.
    pub const ASSIGNABLE: [Self; 5] = [
        Self::Created,
        Self::Paid,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    /// Whether the status is terminal by convention (no transitions out).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// The status as a display string (also the stored representation).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Created => "Created",
            Self::Paid => "Paid",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Created" => Ok(Self::Created),
            "Paid" => Ok(Self::Paid),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_roundtrip_all_statuses() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Created,
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
        ] {
            let parsed = OrderStatus::from_str(status.as_str()).unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn test_unknown_status_rejected() {
        assert!(OrderStatus::from_str("Refunded").is_err());
        assert!(OrderStatus::from_str("paid").is_err());
        assert!(OrderStatus::from_str("").is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Created.is_terminal());
        assert!(!OrderStatus::Paid.is_terminal());
        assert!(!OrderStatus::Shipped.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }

    #[test]
    fn test_assignable_excludes_pending() {
        assert!(!OrderStatus::ASSIGNABLE.contains(&OrderStatus::Pending));
        assert_eq!(OrderStatus::ASSIGNABLE.len(), 5);
    }
}
