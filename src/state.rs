use std::sync::{Arc, RwLock};

use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::DispatchPolicy;
use crate::models::courier::Courier;
use crate::models::delivery::Delivery;
use crate::models::merchant::Merchant;
use crate::models::pool::PoolEntry;
use crate::models::settlement::SettlementRecord;
use crate::notify::{BroadcastNotifier, DeliveryEvent, Notifier};
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub couriers: DashMap<Uuid, Courier>,
    pub merchants: DashMap<Uuid, Merchant>,
    /// Unclaimed pool entries, keyed by order id: one entry per order, and
    /// `remove_if` on this map is the single serialization point of a grab.
    pub pool: DashMap<Uuid, PoolEntry>,
    pub deliveries: DashMap<Uuid, Delivery>,
    /// order id -> delivery id; guards "at most one delivery per order".
    pub deliveries_by_order: DashMap<Uuid, Uuid>,
    /// Keyed by delivery id; insertion here is the exactly-once settlement guard.
    pub settlements: DashMap<Uuid, SettlementRecord>,
    policy: RwLock<Arc<DispatchPolicy>>,
    pub delivery_events_tx: broadcast::Sender<DeliveryEvent>,
    pub notifier: Arc<dyn Notifier>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(policy: DispatchPolicy, event_buffer_size: usize) -> Self {
        let (delivery_events_tx, _unused_rx) = broadcast::channel(event_buffer_size);
        let notifier = Arc::new(BroadcastNotifier::new(delivery_events_tx.clone()));
        Self::with_notifier(policy, delivery_events_tx, notifier)
    }

    pub fn with_notifier(
        policy: DispatchPolicy,
        delivery_events_tx: broadcast::Sender<DeliveryEvent>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            couriers: DashMap::new(),
            merchants: DashMap::new(),
            pool: DashMap::new(),
            deliveries: DashMap::new(),
            deliveries_by_order: DashMap::new(),
            settlements: DashMap::new(),
            policy: RwLock::new(Arc::new(policy)),
            delivery_events_tx,
            notifier,
            metrics: Metrics::new(),
        }
    }

    pub fn policy(&self) -> Arc<DispatchPolicy> {
        self.policy
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn set_policy(&self, policy: DispatchPolicy) {
        let mut slot = self
            .policy
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Arc::new(policy);
    }

    pub fn active_deliveries(&self, courier_id: Uuid) -> Vec<Delivery> {
        self.deliveries
            .iter()
            .filter(|entry| {
                entry.courier_id == courier_id && !entry.status.is_terminal()
            })
            .map(|entry| entry.value().clone())
            .collect()
    }
}
