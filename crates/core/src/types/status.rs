//! Order status.

use serde::{Deserialize, Serialize};

/// Error returned for an unknown order status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid order status code: {0}")]
pub struct OrderStatusError(pub u8);

/// Order lifecycle status.
///
/// The backend serializes this as its integer code, so it round-trips
/// through `u8` rather than a string tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "u8", into = "u8")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }
}

impl From<OrderStatus> for u8 {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Pending => 0,
            OrderStatus::Processing => 1,
            OrderStatus::Shipped => 2,
            OrderStatus::Delivered => 3,
            OrderStatus::Cancelled => 4,
        }
    }
}

impl TryFrom<u8> for OrderStatus {
    type Error = OrderStatusError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Processing),
            2 => Ok(Self::Shipped),
            3 => Ok(Self::Delivered),
            4 => Ok(Self::Cancelled),
            other => Err(OrderStatusError(other)),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_uses_integer_codes() {
        assert_eq!(serde_json::to_string(&OrderStatus::Shipped).unwrap(), "2");
        let status: OrderStatus = serde_json::from_str("4").unwrap();
        assert_eq!(status, OrderStatus::Cancelled);
    }

    #[test]
    fn test_unknown_status_code() {
        assert!(serde_json::from_str::<OrderStatus>("9").is_err());
        assert_eq!(OrderStatus::try_from(9), Err(OrderStatusError(9)));
    }
}
