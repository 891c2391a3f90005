#![allow(dead_code)]
pub mod fakes;

use std::{future::Future, pin::Pin, sync::Arc};

use chrono::{DateTime, Utc};
use settlement_common::Money;
use settlement_engine::{
    db_types::{NewOrder, NewOrderItem, Order, ProductSnapshot},
    events::{EventHandler, EventProducers, Handler, OrderPaidEvent},
    test_utils::prepare_env::{drop_database, prepare_test_env, random_db_path},
    traits::SubscriptionUpdate,
    NotificationApi,
    SettlementDatabase,
    SqliteDatabase,
    WebhookManagement,
};
use tokio::task::JoinHandle;

use self::fakes::RecordingTransport;

pub const SUBSCRIBER_URL: &str = "https://hooks.example.com/settlement";

pub async fn new_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await
}

pub async fn tear_down(db: SqliteDatabase) {
    db.pool().close().await;
    drop_database(db.url()).await;
}

/// A pending order for `total` with a single line item.
pub fn pending_order(number: &str, payment_id: Option<&str>, total: Money) -> NewOrder {
    let item = NewOrderItem::new(
        1,
        1,
        total,
        ProductSnapshot::new("Ceramic mug").with_sku("MUG-01").with_cost_price(Money::from(60)),
    );
    let order = NewOrder::new(number).with_item(item).with_guest_details("Ana Souza", "ana@example.com", "555-0100");
    match payment_id {
        Some(id) => order.with_payment_id(id),
        None => order,
    }
}

pub async fn insert(db: &SqliteDatabase, order: NewOrder) -> Order {
    db.insert_order(order).await.expect("Error inserting order")
}

pub async fn insert_created_at(db: &SqliteDatabase, order: NewOrder, at: DateTime<Utc>) -> Order {
    insert(db, order.created_at(at)).await
}

pub async fn activate_subscription(db: &SqliteDatabase, event_type: &str) -> String {
    let update = SubscriptionUpdate {
        event_type: event_type.to_string(),
        webhook_url: Some(SUBSCRIBER_URL.to_string()),
        active: Some(true),
    };
    let sub = db.upsert_subscription(update, "unused-secret").await.expect("Error activating subscription");
    sub.secret_token.reveal().clone()
}

/// Wires the `order.paid` event to a [`NotificationApi`] that delivers through `transport`.
///
/// Drop every copy of the returned producers, then await the handle, to be sure that every dispatch has finished.
pub fn order_paid_notifier(db: &SqliteDatabase, transport: &RecordingTransport) -> (EventProducers, JoinHandle<()>) {
    let api = NotificationApi::new(db.clone(), transport.clone());
    let hook: Handler<OrderPaidEvent> = Arc::new(move |ev: OrderPaidEvent| {
        let api = api.clone();
        Box::pin(async move {
            if let Err(e) = api.notify_order_paid(&ev.order).await {
                log::error!("🚀️ Could not notify: {e}");
            }
        }) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    let handler = EventHandler::new(16, hook);
    let mut producers = EventProducers::default();
    producers.order_paid_producer.push(handler.subscribe());
    let join = tokio::spawn(handler.start_handler());
    (producers, join)
}
