use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::settlement::EarningsQuote;
use crate::models::courier::GeoPoint;
use crate::models::pool::PoolEntry;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DeliveryStatus {
    Assigned,
    Picking,
    Picked,
    Delivering,
    Delivered,
    Cancelled,
}

impl DeliveryStatus {
    /// The single valid predecessor for a forward transition into `self`.
    /// `Assigned` is only ever an initial state and `Cancelled` is reached
    /// through the cancellation path, so neither has one.
    pub fn required_predecessor(self) -> Option<DeliveryStatus> {
        match self {
            DeliveryStatus::Picking => Some(DeliveryStatus::Assigned),
            DeliveryStatus::Picked => Some(DeliveryStatus::Picking),
            DeliveryStatus::Delivering => Some(DeliveryStatus::Picked),
            DeliveryStatus::Delivered => Some(DeliveryStatus::Delivering),
            DeliveryStatus::Assigned | DeliveryStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Cancelled)
    }
}

/// A claimed order being fulfilled by one courier. The courier reference is
/// immutable after creation and terminal rows are retained for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Delivery {
    pub id: Uuid,
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub merchant_id: Uuid,
    pub courier_id: Uuid,
    pub pickup: GeoPoint,
    pub dropoff: GeoPoint,
    pub distance_km: f64,
    pub fee: i64,
    pub earnings: i64,
    pub collateral_hold: i64,
    pub status: DeliveryStatus,
    pub assigned_at: DateTime<Utc>,
    pub picking_at: Option<DateTime<Utc>>,
    pub picked_at: Option<DateTime<Utc>>,
    pub delivering_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Delivery {
    pub fn assigned(
        entry: &PoolEntry,
        courier_id: Uuid,
        quote: EarningsQuote,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id: entry.order_id,
            customer_id: entry.customer_id,
            merchant_id: entry.merchant_id,
            courier_id,
            pickup: entry.pickup,
            dropoff: entry.dropoff,
            distance_km: entry.distance_km,
            fee: entry.fee,
            earnings: quote.earnings,
            collateral_hold: quote.collateral_hold,
            status: DeliveryStatus::Assigned,
            assigned_at: now,
            picking_at: None,
            picked_at: None,
            delivering_at: None,
            delivered_at: None,
            cancelled_at: None,
        }
    }

    pub fn stamp(&mut self, status: DeliveryStatus, now: DateTime<Utc>) {
        self.status = status;
        match status {
            DeliveryStatus::Assigned => self.assigned_at = now,
            DeliveryStatus::Picking => self.picking_at = Some(now),
            DeliveryStatus::Picked => self.picked_at = Some(now),
            DeliveryStatus::Delivering => self.delivering_at = Some(now),
            DeliveryStatus::Delivered => self.delivered_at = Some(now),
            DeliveryStatus::Cancelled => self.cancelled_at = Some(now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DeliveryStatus;

    #[test]
    fn forward_chain_is_closed_over_predecessors() {
        assert_eq!(
            DeliveryStatus::Picking.required_predecessor(),
            Some(DeliveryStatus::Assigned)
        );
        assert_eq!(
            DeliveryStatus::Picked.required_predecessor(),
            Some(DeliveryStatus::Picking)
        );
        assert_eq!(
            DeliveryStatus::Delivering.required_predecessor(),
            Some(DeliveryStatus::Picked)
        );
        assert_eq!(
            DeliveryStatus::Delivered.required_predecessor(),
            Some(DeliveryStatus::Delivering)
        );
        assert_eq!(DeliveryStatus::Assigned.required_predecessor(), None);
        assert_eq!(DeliveryStatus::Cancelled.required_predecessor(), None);
    }

    #[test]
    fn only_delivered_and_cancelled_are_terminal() {
        assert!(DeliveryStatus::Delivered.is_terminal());
        assert!(DeliveryStatus::Cancelled.is_terminal());
        assert!(!DeliveryStatus::Assigned.is_terminal());
        assert!(!DeliveryStatus::Picking.is_terminal());
        assert!(!DeliveryStatus::Picked.is_terminal());
        assert!(!DeliveryStatus::Delivering.is_terminal());
    }
}
