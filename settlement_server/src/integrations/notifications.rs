use futures::future::BoxFuture;
use log::*;
use settlement_engine::{
    events::{EventHandlers, EventHooks, OrderAnnulledEvent},
    DispatchOutcome,
    NotificationApi,
    SqliteDatabase,
};

use crate::integrations::HttpWebhookTransport;

pub const NOTIFICATION_EVENT_BUFFER_SIZE: usize = 25;

pub type ServerNotificationApi = NotificationApi<SqliteDatabase, HttpWebhookTransport>;

/// Wires the engine's order events to outbound webhooks.
///
/// 1. OrderPaidEvent - the `order.paid` webhook is signed and posted to its subscriber, if there is an active one.
///    The event only fires for the transition that actually marked the order as paid, so a subscriber sees each paid
///    order once, whichever path (reconciliation or payment notification) got there first.
/// 2. OrderAnnulledEvent - failed and expired payments are logged. They have no webhook.
pub fn create_notification_event_handlers(api: ServerNotificationApi) -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(move |ev| {
        let api = api.clone();
        let order = ev.order;
        Box::pin(async move {
            match api.notify_order_paid(&order).await {
                Ok(DispatchOutcome::Delivered { status }) => {
                    info!("📬️ order.paid for {} delivered ({status})", order.order_number)
                },
                Ok(DispatchOutcome::Failed { status, error }) => warn!(
                    "📬️ order.paid for {} was not accepted. Status: {}. {error}",
                    order.order_number,
                    status.map(|s| s.to_string()).unwrap_or_else(|| "none".into())
                ),
                Ok(DispatchOutcome::Skipped) => debug!("📬️ order.paid for {} skipped", order.order_number),
                Err(e) => error!("📬️ Could not send order.paid for {}. {e}", order.order_number),
            }
        }) as BoxFuture<'static, ()>
    });
    hooks.on_order_annulled(|ev| {
        let OrderAnnulledEvent { order, transition } = ev;
        Box::pin(async move {
            info!("📬️ Order {} annulled ({transition})", order.order_number);
        }) as BoxFuture<'static, ()>
    });
    EventHandlers::new(NOTIFICATION_EVENT_BUFFER_SIZE, hooks)
}
