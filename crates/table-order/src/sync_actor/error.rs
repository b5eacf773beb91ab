use crate::gateway::GatewayError;
use crate::model::{OrderStatus, ProductId};
use replica_framework::FrameworkError;
use rust_decimal::Decimal;

/// Rejections that happen on the device, before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Product {0} is not in the order")]
    ItemNotInOrder(ProductId),
    #[error("Order is {0} and no longer takes items")]
    NotTakingItems(OrderStatus),
    #[error("Cannot move order from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },
    #[error("Rating must be between 1 and 5, got {0}")]
    RatingOutOfRange(u8),
    #[error("Assistance request needs a description")]
    EmptyAssistanceDetails,
    #[error("Amount received {tendered} is less than the total {total}")]
    InsufficientCash { tendered: Decimal, total: Decimal },
    #[error("Tip cannot be negative")]
    NegativeTip,
}

/// Errors surfaced by the order sync core.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error("Table has {count} active orders")]
    AmbiguousActiveOrder { count: usize },
    #[error("Active order lookup failed: {0}")]
    InitializationFailed(#[source] GatewayError),
    #[error("Session is not ready")]
    SessionUnavailable,
    #[error("No active order")]
    NoActiveOrder,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Framework(#[from] FrameworkError),
}

impl SyncError {
    /// Whether repeating the same action may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Gateway(_))
    }

    /// Short text for the diner.
    pub fn user_notice(&self) -> String {
        match self {
            SyncError::AmbiguousActiveOrder { .. } | SyncError::InitializationFailed(_) => {
                "We could not load this table's order. Please ask the staff for help.".to_string()
            }
            SyncError::SessionUnavailable | SyncError::Framework(_) => {
                "The table session is not available right now.".to_string()
            }
            SyncError::NoActiveOrder => "There is no order for this table yet.".to_string(),
            SyncError::Validation(error) => error.to_string(),
            SyncError::Gateway(_) => "Something went wrong. Please try again.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_remote_failures_are_retryable() {
        assert!(SyncError::Gateway(GatewayError::Transport("offline".into())).is_retryable());
        assert!(!SyncError::NoActiveOrder.is_retryable());
        assert!(!SyncError::AmbiguousActiveOrder { count: 2 }.is_retryable());
        assert!(!SyncError::from(ValidationError::RatingOutOfRange(0)).is_retryable());
    }

    #[test]
    fn test_validation_notice_is_the_message() {
        let error = SyncError::from(ValidationError::InsufficientCash {
            tendered: Decimal::from(5000),
            total: Decimal::from(8000),
        });
        assert_eq!(
            error.user_notice(),
            "Amount received 5000 is less than the total 8000"
        );
    }
}
