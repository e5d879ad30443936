use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::delivery::{Delivery, DeliveryStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub delivery_id: Uuid,
    pub order_id: Uuid,
    pub customer_id: Uuid,
    pub merchant_id: Uuid,
    pub courier_id: Uuid,
    pub status: DeliveryStatus,
    pub occurred_at: DateTime<Utc>,
}

impl DeliveryEvent {
    pub fn from_delivery(delivery: &Delivery, occurred_at: DateTime<Utc>) -> Self {
        Self {
            delivery_id: delivery.id,
            order_id: delivery.order_id,
            customer_id: delivery.customer_id,
            merchant_id: delivery.merchant_id,
            courier_id: delivery.courier_id,
            status: delivery.status,
            occurred_at,
        }
    }
}

/// Best-effort fan-out to the order's customer and merchant. A failed
/// notification never rolls back the state transition that produced it.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: DeliveryEvent);
}

pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _event: DeliveryEvent) {}
}

pub struct BroadcastNotifier {
    tx: broadcast::Sender<DeliveryEvent>,
}

impl BroadcastNotifier {
    pub fn new(tx: broadcast::Sender<DeliveryEvent>) -> Self {
        Self { tx }
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, event: DeliveryEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("no delivery event subscribers");
        }
    }
}
