use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::engine::settlement;
use crate::error::AppError;
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::models::settlement::SettlementReason;
use crate::notify::DeliveryEvent;
use crate::state::AppState;

/// Advances one delivery one step forward. The check-then-act runs under the
/// delivery's exclusive map guard, so concurrent calls on the same delivery
/// serialize and the loser fails WrongStatus instead of tearing the record.
pub fn advance(
    state: &AppState,
    delivery_id: Uuid,
    courier_id: Uuid,
    target: DeliveryStatus,
    now: DateTime<Utc>,
) -> Result<Delivery, AppError> {
    let result = transition(state, delivery_id, courier_id, target, now);

    let outcome = match &result {
        Ok(_) => "success",
        Err(err) => err.code(),
    };
    state
        .metrics
        .transitions_total
        .with_label_values(&[target_label(target), outcome])
        .inc();

    result
}

fn transition(
    state: &AppState,
    delivery_id: Uuid,
    courier_id: Uuid,
    target: DeliveryStatus,
    now: DateTime<Utc>,
) -> Result<Delivery, AppError> {
    let expected = target.required_predecessor().ok_or_else(|| {
        AppError::Validation(format!("{target:?} is not a forward transition target"))
    })?;

    let updated;
    {
        let mut delivery = state
            .deliveries
            .get_mut(&delivery_id)
            .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

        // Ownership before status: an impostor sees the same answer no
        // matter what state the delivery is in.
        if delivery.courier_id != courier_id {
            return Err(AppError::Forbidden(
                "delivery is assigned to another courier".to_string(),
            ));
        }

        if delivery.status != expected {
            return Err(AppError::WrongStatus {
                expected,
                actual: delivery.status,
            });
        }

        delivery.stamp(target, now);
        updated = delivery.clone();
    }

    if target == DeliveryStatus::Delivered {
        let record = settlement::finalize(state, &updated, SettlementReason::Completed, now);
        info!(
            delivery_id = %updated.id,
            courier_id = %updated.courier_id,
            earnings = record.earnings,
            collateral_released = record.collateral_released,
            "delivery completed and settled"
        );
    } else {
        info!(delivery_id = %updated.id, status = ?updated.status, "delivery advanced");
    }

    state
        .notifier
        .notify(DeliveryEvent::from_delivery(&updated, now));

    Ok(updated)
}

/// Cancellation path, driven by the order-cancellation flow rather than the
/// courier: any non-terminal delivery can be cancelled, releasing the hold
/// and settling zero earnings.
pub fn cancel(state: &AppState, delivery_id: Uuid, now: DateTime<Utc>) -> Result<Delivery, AppError> {
    let updated;
    {
        let mut delivery = state
            .deliveries
            .get_mut(&delivery_id)
            .ok_or_else(|| AppError::NotFound(format!("delivery {delivery_id} not found")))?;

        if delivery.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "delivery {} is already {:?}",
                delivery_id, delivery.status
            )));
        }

        delivery.stamp(DeliveryStatus::Cancelled, now);
        updated = delivery.clone();
    }

    settlement::finalize(state, &updated, SettlementReason::Cancelled, now);
    state
        .metrics
        .transitions_total
        .with_label_values(&["cancelled", "success"])
        .inc();
    info!(delivery_id = %updated.id, "delivery cancelled");
    state
        .notifier
        .notify(DeliveryEvent::from_delivery(&updated, now));

    Ok(updated)
}

fn target_label(target: DeliveryStatus) -> &'static str {
    match target {
        DeliveryStatus::Assigned => "assigned",
        DeliveryStatus::Picking => "picking",
        DeliveryStatus::Picked => "picked",
        DeliveryStatus::Delivering => "delivering",
        DeliveryStatus::Delivered => "delivered",
        DeliveryStatus::Cancelled => "cancelled",
    }
}
