use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use settlement_common::{GatewayStatus, Money};

use crate::{
    db_types::{HistorySource, Order, OrderStatusType, PaymentStatusType},
    events::{EventProducers, OrderAnnulledEvent, OrderPaidEvent},
    order_state::{transition, NoOpReason, PaymentTransition, PaymentTrigger, TransitionAction},
    traits::{PaymentUpdate, SettlementDatabase, SettlementError, StatusUpdate},
};

/// The result of feeding a payment trigger into an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The order was updated and the history entry written.
    Applied { order: Order, transition: PaymentTransition },
    /// Nothing needed to change.
    NoOp(NoOpReason),
    /// Someone else changed the order between our read and our write. Nothing was written.
    Superseded,
}

/// Extra details that ride along with a payment trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentDetails {
    pub payment_id: Option<String>,
    pub payment_method: Option<String>,
    pub note: String,
}

impl PaymentDetails {
    pub fn with_note<S: Into<String>>(note: S) -> Self {
        Self { note: note.into(), ..Default::default() }
    }
}

/// A payment status pushed to us by a payment notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotification {
    pub payment_id: String,
    pub status: GatewayStatus,
    pub amount: Option<Money>,
    pub external_reference: Option<String>,
    pub payment_method: Option<String>,
}

impl PaymentNotification {
    pub fn new<S: Into<String>>(payment_id: S, status: GatewayStatus) -> Self {
        Self { payment_id: payment_id.into(), status, amount: None, external_reference: None, payment_method: None }
    }

    pub fn with_external_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.external_reference = Some(reference.into());
        self
    }

    pub fn with_payment_method<S: Into<String>>(mut self, method: S) -> Self {
        self.payment_method = Some(method.into());
        self
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    /// The order was already paid, or expired. The notification was ignored.
    AlreadySettled(Order),
    /// The notification moved the order to a new state.
    Updated(Order),
    /// The notification did not change anything.
    Unchanged { order: Order, reason: NoOpReason },
    /// Another path updated the order first. This is the order as it is now.
    Superseded(Order),
}

impl NotificationOutcome {
    pub fn order(&self) -> &Order {
        match self {
            Self::AlreadySettled(o) | Self::Updated(o) | Self::Superseded(o) => o,
            Self::Unchanged { order, .. } => order,
        }
    }
}

/// `OrderFlowApi` drives orders through the payment state machine, in response to gateway reports, payment
/// notifications, the unpaid-order timeout and operator edits.
///
/// Every write goes through a conditional update, so concurrent callers can safely race on the same order. Only the
/// caller that actually moves an order to `paid` publishes the [`OrderPaidEvent`].
#[derive(Clone)]
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderFlowApi<B>
where B: SettlementDatabase
{
    /// Feeds `trigger` into the state machine for `order`, as the order was when it was read.
    ///
    /// If the state machine calls for a change, the order row and its history are updated atomically, on condition
    /// that the order is still in the state it was read in. The hooks are called after the write is durable.
    pub async fn apply_payment_status(
        &self,
        order: &Order,
        trigger: &PaymentTrigger,
        source: HistorySource,
        details: PaymentDetails,
    ) -> Result<TransitionOutcome, SettlementError> {
        let transition = match transition(order, trigger) {
            TransitionAction::Apply(t) => t,
            TransitionAction::NoOp(reason) => {
                match &reason {
                    NoOpReason::AlreadyTerminal(p) => {
                        info!("🔄️ Order {} is already {}/{p}. Ignoring {trigger}.", order.order_number, order.status)
                    },
                    NoOpReason::UnknownStatus(s) => {
                        warn!("🔄️ Order {} received unknown payment status '{s}'. Order left as is.", order.order_number)
                    },
                    _ => debug!("🔄️ Order {} unchanged by {trigger} ({reason})", order.order_number),
                }
                return Ok(TransitionOutcome::NoOp(reason));
            },
        };
        let note = if details.note.is_empty() { format!("{trigger}: {transition}") } else { details.note };
        let update = PaymentUpdate {
            order_id: order.id,
            expected_status: transition.from_status,
            expected_payment_status: transition.from_payment_status,
            status: transition.status,
            payment_status: transition.payment_status,
            payment_id: details.payment_id,
            payment_method: details.payment_method,
            source,
            note,
        };
        let Some(updated) = self.db.apply_payment_update(update).await? else {
            info!("🔄️ Order {} was changed by another process before {trigger} could be applied.", order.order_number);
            return Ok(TransitionOutcome::Superseded);
        };
        info!("🔄️ Order {} transitioned {transition} ({source})", updated.order_number);
        if transition.first_paid {
            self.call_order_paid_hook(&updated).await;
        } else {
            self.call_order_annulled_hook(&updated, transition).await;
        }
        Ok(TransitionOutcome::Applied { order: updated, transition })
    }

    /// Handles a payment status pushed by a payment notifier.
    ///
    /// The order is located by payment id, then by external reference. Notifications for orders that are already
    /// settled are acknowledged without touching the order, so duplicate and out-of-order deliveries are harmless.
    pub async fn process_payment_notification(
        &self,
        notification: PaymentNotification,
    ) -> Result<NotificationOutcome, SettlementError> {
        let payment_id = notification.payment_id.trim();
        if payment_id.is_empty() {
            return Err(SettlementError::ValidationError("paymentId is required".into()));
        }
        if let GatewayStatus::Unknown(s) = &notification.status {
            if s.is_empty() {
                return Err(SettlementError::ValidationError("status is required".into()));
            }
        }
        let order = self.locate_order(payment_id, notification.external_reference.as_deref()).await?;
        if order.is_settled() {
            debug!("🔄️ Order {} is already settled. Notification for {payment_id} ignored.", order.order_number);
            return Ok(NotificationOutcome::AlreadySettled(order));
        }
        if let Some(amount) = notification.amount {
            if amount.rounded() != order.total_amount.rounded() {
                warn!(
                    "🔄️ Notification for order {} reports {amount}, but the order total is {}",
                    order.order_number, order.total_amount
                );
            }
        }
        let details = PaymentDetails {
            payment_id: Some(payment_id.to_string()),
            payment_method: notification.payment_method.filter(|m| !m.trim().is_empty()),
            note: format!("Payment notification: {} ({payment_id})", notification.status),
        };
        let trigger = PaymentTrigger::Gateway(notification.status);
        let outcome = self.apply_payment_status(&order, &trigger, HistorySource::Notification, details).await?;
        let result = match outcome {
            TransitionOutcome::Applied { order, .. } => NotificationOutcome::Updated(order),
            TransitionOutcome::NoOp(reason) => NotificationOutcome::Unchanged { order, reason },
            TransitionOutcome::Superseded => {
                let current = self.db.fetch_order(order.id).await?.unwrap_or(order);
                NotificationOutcome::Superseded(current)
            },
        };
        Ok(result)
    }

    async fn locate_order(&self, payment_id: &str, reference: Option<&str>) -> Result<Order, SettlementError> {
        if let Some(order) = self.db.fetch_order_by_payment_id(payment_id).await? {
            return Ok(order);
        }
        let reference = reference.map(str::trim).filter(|r| !r.is_empty());
        if let Some(reference) = reference {
            if let Some(order) = self.db.fetch_order_by_external_reference(reference).await? {
                trace!("🔄️ Payment {payment_id} matched order {} by external reference", order.order_number);
                return Ok(order);
            }
        }
        Err(SettlementError::OrderNotFound(format!("for payment {payment_id}")))
    }

    /// Cancels pending orders that have gone unpaid for longer than `timeout`. Each order gets its own history entry.
    /// Failures are logged and skipped. Returns the orders that were expired.
    pub async fn expire_unpaid_orders(&self, timeout: Duration, limit: u32) -> Result<Vec<Order>, SettlementError> {
        let cutoff = Utc::now() - timeout;
        let candidates = self.db.fetch_unpaid_orders_created_before(cutoff, limit).await?;
        let mut expired = Vec::with_capacity(candidates.len());
        for order in candidates {
            let details = PaymentDetails::with_note(format!("Unpaid for more than {} hours", timeout.num_hours()));
            match self.apply_payment_status(&order, &PaymentTrigger::Expired, HistorySource::Expiry, details).await {
                Ok(TransitionOutcome::Applied { order, .. }) => expired.push(order),
                Ok(_) => {},
                Err(e) => error!("🔄️ Could not expire order {}. {e}", order.order_number),
            }
        }
        if !expired.is_empty() {
            info!("🔄️ {} unpaid orders have expired", expired.len());
        }
        Ok(expired)
    }

    /// Sets the order status on behalf of an operator. Payment status is never touched, and a paid order can only move
    /// between post-payment statuses.
    pub async fn modify_status_for_order(
        &self,
        order_id: i64,
        new_status: OrderStatusType,
        note: Option<String>,
    ) -> Result<Order, SettlementError> {
        let order = self
            .db
            .fetch_order(order_id)
            .await?
            .ok_or_else(|| SettlementError::OrderNotFound(order_id.to_string()))?;
        if order.status == new_status {
            return Err(SettlementError::OrderModificationNoOp);
        }
        if order.payment_status == PaymentStatusType::Paid && !new_status.is_post_payment() {
            return Err(SettlementError::ValidationError(format!(
                "Order {} has been paid and cannot be set to {new_status}",
                order.order_number
            )));
        }
        if order.payment_status == PaymentStatusType::Pending && new_status.is_post_payment() {
            warn!("🔄️ Order {} is unpaid, but is being set to {new_status} by an operator", order.order_number);
        }
        let update = StatusUpdate {
            order_id,
            expected_status: order.status,
            status: new_status,
            note: note.unwrap_or_else(|| format!("Status changed from {} to {new_status}", order.status)),
        };
        let updated = self.db.apply_status_update(update).await?.ok_or(SettlementError::Superseded(order_id))?;
        info!("🔄️ Order {} status changed {} -> {}", updated.order_number, order.status, updated.status);
        Ok(updated)
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            debug!("🔄️ Notifying order paid hook subscribers");
            emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }

    async fn call_order_annulled_hook(&self, order: &Order, transition: PaymentTransition) {
        for emitter in &self.producers.order_annulled_producer {
            debug!("🔄️ Notifying order annulled hook subscribers");
            emitter.publish_event(OrderAnnulledEvent::new(order.clone(), transition)).await;
        }
    }
}
