use super::error::SyncError;
use super::state::Ack;
use crate::gateway::StatusDetails;
use crate::model::{OrderId, OrderStatus, Product};
use replica_framework::Response;

/// How an item mutation changes a product's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    /// Relative to the quantity last seen on this device. `+1`/`-1` for a stepper.
    ///
    /// A positive delta on a product that is not in the order creates its line with one unit.
    Delta(i32),
    /// An absolute quantity. Zero removes the line.
    Target(u32),
}

impl QuantityChange {
    /// The resulting quantity, given the current one (`None` when the product is absent).
    ///
    /// Lowering or zeroing an absent product has no result; a negative sum clamps to zero.
    pub fn resolve(self, current: Option<u32>) -> Option<u32> {
        match (self, current) {
            (QuantityChange::Delta(delta), None) => (delta > 0).then_some(1),
            (QuantityChange::Target(0), None) => None,
            (QuantityChange::Delta(delta), Some(current)) => {
                let next = i64::from(current) + i64::from(delta);
                Some(u32::try_from(next.max(0)).unwrap_or(u32::MAX))
            }
            (QuantityChange::Target(target), _) => Some(target),
        }
    }
}

/// Requests understood by the [`OrderSyncActor`](super::OrderSyncActor).
#[derive(Debug)]
pub enum SyncRequest {
    /// Drops any current order and looks up the table's active order.
    Initialize {
        respond_to: Response<Option<OrderId>, SyncError>,
    },
    UpsertItem {
        product: Product,
        change: QuantityChange,
        respond_to: Response<Ack, SyncError>,
    },
    Transition {
        status: OrderStatus,
        details: StatusDetails,
        respond_to: Response<Ack, SyncError>,
    },
    RequestAssistance {
        details: String,
        respond_to: Response<(), SyncError>,
    },
    SubmitFeedback {
        rating: u8,
        comment: Option<String>,
        respond_to: Response<Ack, SyncError>,
    },
    /// Re-reads the current order (or the table's active order) and reopens the subscription.
    Resync {
        respond_to: Response<Option<OrderId>, SyncError>,
    },
    Reset {
        respond_to: Response<(), SyncError>,
    },
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_from_present_quantity() {
        assert_eq!(QuantityChange::Delta(1).resolve(Some(2)), Some(3));
        assert_eq!(QuantityChange::Delta(-1).resolve(Some(1)), Some(0));
        assert_eq!(QuantityChange::Delta(-5).resolve(Some(2)), Some(0));
    }

    #[test]
    fn test_delta_on_absent_product() {
        assert_eq!(QuantityChange::Delta(1).resolve(None), Some(1));
        assert_eq!(QuantityChange::Delta(3).resolve(None), Some(1));
        assert!(QuantityChange::Delta(-1).resolve(None).is_none());
        assert!(QuantityChange::Delta(0).resolve(None).is_none());
    }

    #[test]
    fn test_target() {
        assert_eq!(QuantityChange::Target(4).resolve(Some(1)), Some(4));
        assert_eq!(QuantityChange::Target(0).resolve(Some(1)), Some(0));
        assert_eq!(QuantityChange::Target(2).resolve(None), Some(2));
        assert!(QuantityChange::Target(0).resolve(None).is_none());
    }
}
