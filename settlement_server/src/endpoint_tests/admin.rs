use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use settlement_common::{GatewayStatus, Money, PaymentStatusReport};
use settlement_engine::{
    db_types::{CustomerProfile, OrderItem, OrderStatusType, PaymentStatusType, ProductSnapshot},
    events::EventProducers,
    fees::{FeeCalculator, FeeRates, OrderFeeBreakdown},
    reconciliation_objects::ReconciliationConfig,
    traits::{DeliveryResponse, GatewayError},
    NotificationApi,
    OrderFlowApi,
    ReconciliationApi,
    SettlementApi,
    WebhookApi,
};

use super::{
    helpers::{admin_request, admin_secret, paid_order, pending_order, send_request, subscription},
    mocks::{MockGateway, MockSettlementDb, MockTransport},
};
use crate::{
    data_objects::{JsonResponse, RotatedSecret},
    middleware::AdminTokenMiddlewareFactory,
    routes::{
        ConfigureWebhookRoute,
        NotifyUserCreatedRoute,
        NotifyUserInactiveRoute,
        OrderFeesRoute,
        ReconcileRoute,
        ResendOrderPaidRoute,
        RotateWebhookSecretRoute,
        UpdateOrderStatusRoute,
        WebhookSubscriptionsRoute,
    },
};

fn configure_settlement(db: MockSettlementDb) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = SettlementApi::new(db, FeeCalculator::new(FeeRates::default()));
        cfg.app_data(web::Data::new(api)).service(
            web::scope("/admin")
                .wrap(AdminTokenMiddlewareFactory::new(admin_secret()))
                .service(OrderFeesRoute::<MockSettlementDb>::new()),
        );
    }
}

fn configure_order_flow(db: MockSettlementDb) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = OrderFlowApi::new(db, EventProducers::default());
        cfg.app_data(web::Data::new(api)).service(
            web::scope("/admin")
                .wrap(AdminTokenMiddlewareFactory::new(admin_secret()))
                .service(UpdateOrderStatusRoute::<MockSettlementDb>::new()),
        );
    }
}

fn configure_reconciliation(db: MockSettlementDb, gateway: MockGateway) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let flow = OrderFlowApi::new(db, EventProducers::default());
        let api = ReconciliationApi::new(flow, gateway, ReconciliationConfig::default());
        cfg.app_data(web::Data::new(api)).service(
            web::scope("/admin")
                .wrap(AdminTokenMiddlewareFactory::new(admin_secret()))
                .service(ReconcileRoute::<MockSettlementDb, MockGateway>::new()),
        );
    }
}

fn configure_webhooks(db: MockSettlementDb) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = WebhookApi::new(db);
        cfg.app_data(web::Data::new(api)).service(
            web::scope("/admin")
                .wrap(AdminTokenMiddlewareFactory::new(admin_secret()))
                .service(WebhookSubscriptionsRoute::<MockSettlementDb>::new())
                .service(ConfigureWebhookRoute::<MockSettlementDb>::new())
                .service(RotateWebhookSecretRoute::<MockSettlementDb>::new()),
        );
    }
}

fn configure_notifications(db: MockSettlementDb, transport: MockTransport) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = NotificationApi::new(db, transport);
        cfg.app_data(web::Data::new(api)).service(
            web::scope("/admin")
                .wrap(AdminTokenMiddlewareFactory::new(admin_secret()))
                .service(ResendOrderPaidRoute::<MockSettlementDb, MockTransport>::new())
                .service(NotifyUserCreatedRoute::<MockSettlementDb, MockTransport>::new())
                .service(NotifyUserInactiveRoute::<MockSettlementDb, MockTransport>::new()),
        );
    }
}

fn customer(user_id: &str) -> CustomerProfile {
    CustomerProfile {
        user_id: user_id.to_string(),
        full_name: Some("Ana Souza".into()),
        email: Some("ana@example.com".into()),
        phone: None,
        created_at: Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap(),
    }
}

fn order_item(cost_price: Option<Money>) -> OrderItem {
    let mut snapshot = ProductSnapshot::new("Ceramic mug").with_sku("MUG-01");
    if let Some(cost) = cost_price {
        snapshot = snapshot.with_cost_price(cost);
    }
    OrderItem {
        id: 1,
        order_id: 42,
        product_id: 7,
        quantity: 1,
        unit_price: Money::from_cents(10_000),
        total_price: Money::from_cents(10_000),
        snapshot,
    }
}

//----------------------------------------------   Authentication  ----------------------------------------------------

#[actix_web::test]
async fn missing_token_is_refused() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().never();
    let req = TestRequest::get().uri("/admin/orders/42/fees");
    let (status, body) = send_request(req, configure_settlement(db)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Authentication Error. No bearer token was provided."}"#);
}

#[actix_web::test]
async fn wrong_token_is_refused() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().never();
    let req = TestRequest::get().uri("/admin/orders/42/fees").insert_header(("Authorization", "Bearer letmein"));
    let (status, body) = send_request(req, configure_settlement(db)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("The bearer token is not valid."), "{body}");
}

//----------------------------------------------   Fee breakdown  ----------------------------------------------------

#[actix_web::test]
async fn fee_breakdown_from_snapshot_cost() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().withf(|id| *id == 42).times(1).returning(|_| Ok(Some(pending_order())));
    db.expect_fetch_order_items()
        .times(1)
        .returning(|_| Ok(vec![order_item(Some(Money::from_cents(6_000)))]));
    db.expect_fetch_product_cost().never();
    let req = admin_request(TestRequest::get().uri("/admin/orders/42/fees"));
    let (status, body) = send_request(req, configure_settlement(db)).await;
    assert_eq!(status, StatusCode::OK);
    let breakdown: OrderFeeBreakdown = serde_json::from_str(&body).unwrap();
    assert_eq!(breakdown.order_number, "ORD-1042");
    assert_eq!(breakdown.subtotal, Money::from_cents(10_000));
    assert_eq!(breakdown.total_revenue, Money::from_cents(11_500));
    assert_eq!(breakdown.transaction_fee, Money::from_cents(450));
    assert_eq!(breakdown.after_transaction, Money::from_cents(9_550));
    assert_eq!(breakdown.contingency_fee, Money::from_cents(96));
    assert_eq!(breakdown.total_cost, Money::from_cents(6_000));
    assert_eq!(breakdown.net_profit, Money::from_cents(3_455));
    assert!(!breakdown.is_estimated);
}

#[actix_web::test]
async fn fee_breakdown_with_estimated_cost() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().times(1).returning(|_| Ok(Some(pending_order())));
    db.expect_fetch_order_items().times(1).returning(|_| Ok(vec![order_item(None)]));
    db.expect_fetch_product_cost().withf(|id| *id == 7).times(1).returning(|_| Ok(Some(Money::from_cents(5_000))));
    let req = admin_request(TestRequest::get().uri("/admin/orders/42/fees"));
    let (status, body) = send_request(req, configure_settlement(db)).await;
    assert_eq!(status, StatusCode::OK);
    let breakdown: OrderFeeBreakdown = serde_json::from_str(&body).unwrap();
    assert_eq!(breakdown.total_cost, Money::from_cents(5_000));
    assert!(breakdown.is_estimated);
}

#[actix_web::test]
async fn fee_breakdown_for_unknown_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().times(1).returning(|_| Ok(None));
    db.expect_fetch_order_items().never();
    let req = admin_request(TestRequest::get().uri("/admin/orders/404/fees"));
    let (status, _) = send_request(req, configure_settlement(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

//----------------------------------------------   Status edits  ----------------------------------------------------

#[actix_web::test]
async fn ship_a_paid_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().times(1).returning(|_| Ok(Some(paid_order())));
    db.expect_apply_status_update()
        .withf(|u| {
            u.order_id == 42
                && u.expected_status == OrderStatusType::Processing
                && u.status == OrderStatusType::Shipped
                && u.note == "Tracking BR123"
        })
        .times(1)
        .returning(|_| {
            let mut order = paid_order();
            order.status = OrderStatusType::Shipped;
            Ok(Some(order))
        });
    let req = admin_request(TestRequest::post().uri("/admin/orders/42/status"))
        .set_json(serde_json::json!({ "status": "shipped", "note": "Tracking BR123" }));
    let (status, body) = send_request(req, configure_order_flow(db)).await;
    assert_eq!(status, StatusCode::OK);
    let order: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(order["status"], "shipped");
    assert_eq!(order["payment_status"], "paid");
}

#[actix_web::test]
async fn same_status_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().times(1).returning(|_| Ok(Some(paid_order())));
    db.expect_apply_status_update().never();
    let req = admin_request(TestRequest::post().uri("/admin/orders/42/status"))
        .set_json(serde_json::json!({ "status": "processing" }));
    let (status, _) = send_request(req, configure_order_flow(db)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[actix_web::test]
async fn concurrent_status_edit_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().times(1).returning(|_| Ok(Some(paid_order())));
    db.expect_apply_status_update().times(1).returning(|_| Ok(None));
    let req = admin_request(TestRequest::post().uri("/admin/orders/42/status"))
        .set_json(serde_json::json!({ "status": "delivered" }));
    let (status, body) = send_request(req, configure_order_flow(db)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("modified by someone else"), "{body}");
}

#[actix_web::test]
async fn paid_order_cannot_be_cancelled() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().times(1).returning(|_| Ok(Some(paid_order())));
    db.expect_apply_status_update().never();
    let req = admin_request(TestRequest::post().uri("/admin/orders/42/status"))
        .set_json(serde_json::json!({ "status": "cancelled" }));
    let (status, body) = send_request(req, configure_order_flow(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("cannot be set to cancelled"), "{body}");
}

//----------------------------------------------   Reconciliation  ----------------------------------------------------

#[actix_web::test]
async fn manual_reconciliation_run() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_reconcilable_orders().times(1).returning(|_| Ok(vec![pending_order()]));
    db.expect_apply_payment_update()
        .withf(|u| u.payment_status == PaymentStatusType::Paid && u.payment_id.is_none())
        .times(1)
        .returning(|_| Ok(Some(paid_order())));
    let mut gateway = MockGateway::new();
    gateway
        .expect_fetch_status()
        .withf(|reference| reference == "pay-1042")
        .times(1)
        .returning(|reference| Ok(PaymentStatusReport::new(reference, GatewayStatus::Approved)));
    let req = admin_request(TestRequest::post().uri("/admin/reconcile"));
    let (status, body) = send_request(req, configure_reconciliation(db, gateway)).await;
    assert_eq!(status, StatusCode::OK);
    let report: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(report["checked"], 1);
    assert_eq!(report["updated"], 1);
    assert_eq!(report["errors"], 0);
    assert_eq!(report["details"][0]["order_number"], "ORD-1042");
    assert_eq!(report["details"][0]["payment_status"], "paid");
}

#[actix_web::test]
async fn gateway_errors_are_reported_not_raised() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_reconcilable_orders().times(1).returning(|_| Ok(vec![pending_order()]));
    db.expect_apply_payment_update().never();
    let mut gateway = MockGateway::new();
    gateway.expect_fetch_status().times(1).returning(|_| Err(GatewayError::Timeout("read timed out".into())));
    let req = admin_request(TestRequest::post().uri("/admin/reconcile"));
    let (status, body) = send_request(req, configure_reconciliation(db, gateway)).await;
    assert_eq!(status, StatusCode::OK);
    let report: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(report["checked"], 1);
    assert_eq!(report["updated"], 0);
    assert_eq!(report["errors"], 1);
}

//----------------------------------------------   Webhook subscriptions  ----------------------------------------------

#[actix_web::test]
async fn subscription_secrets_are_masked() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_subscriptions()
        .times(1)
        .returning(|| Ok(vec![subscription("order.paid", Some("https://hooks.example.com/paid"), true)]));
    let req = admin_request(TestRequest::get().uri("/admin/webhooks"));
    let (status, body) = send_request(req, configure_webhooks(db)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("****cdef"), "{body}");
    assert!(!body.contains("0123456789abcdef"), "{body}");
}

#[actix_web::test]
async fn configure_subscription() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_subscription().withf(|ev| ev == "order.paid").times(1).returning(|_| Ok(None));
    db.expect_upsert_subscription()
        .withf(|update, secret| {
            update.webhook_url.as_deref() == Some("https://hooks.example.com/paid")
                && update.active == Some(true)
                && secret.len() == 64
        })
        .times(1)
        .returning(|_, _| Ok(subscription("order.paid", Some("https://hooks.example.com/paid"), true)));
    let req = admin_request(TestRequest::put().uri("/admin/webhooks/order.paid"))
        .set_json(serde_json::json!({ "webhook_url": "https://hooks.example.com/paid", "active": true }));
    let (status, body) = send_request(req, configure_webhooks(db)).await;
    assert_eq!(status, StatusCode::OK);
    let summary: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(summary["active"], true);
    assert_eq!(summary["webhook_url"], "https://hooks.example.com/paid");
}

#[actix_web::test]
async fn cannot_activate_without_url() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_subscription().times(1).returning(|_| Ok(None));
    db.expect_upsert_subscription().never();
    let req = admin_request(TestRequest::put().uri("/admin/webhooks/order.paid"))
        .set_json(serde_json::json!({ "active": true }));
    let (status, _) = send_request(req, configure_webhooks(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_event_type() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_subscription().never();
    let req = admin_request(TestRequest::put().uri("/admin/webhooks/order.refunded"))
        .set_json(serde_json::json!({ "active": false }));
    let (status, _) = send_request(req, configure_webhooks(db)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn rotate_secret() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_rotate_secret()
        .withf(|ev, secret| ev == "order.paid" && secret.len() == 64)
        .times(1)
        .returning(|_, _| Ok(Some(subscription("order.paid", None, false))));
    let req = admin_request(TestRequest::post().uri("/admin/webhooks/order.paid/rotate"));
    let (status, body) = send_request(req, configure_webhooks(db)).await;
    assert_eq!(status, StatusCode::OK);
    let rotated: RotatedSecret = serde_json::from_str(&body).unwrap();
    assert_eq!(rotated.event_type, "order.paid");
    assert_eq!(rotated.secret_token.len(), 64);
}

#[actix_web::test]
async fn rotate_missing_subscription() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_rotate_secret().times(1).returning(|_, _| Ok(None));
    let req = admin_request(TestRequest::post().uri("/admin/webhooks/user.created/rotate"));
    let (status, _) = send_request(req, configure_webhooks(db)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

//----------------------------------------------   Resending order.paid  ----------------------------------------------

#[actix_web::test]
async fn resend_order_paid() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().times(1).returning(|_| Ok(Some(paid_order())));
    db.expect_fetch_order_items().times(1).returning(|_| Ok(vec![]));
    db.expect_fetch_status_history().withf(|id| *id == 42).times(1).returning(|_| Ok(vec![]));
    db.expect_fetch_subscription()
        .withf(|ev| ev == "order.paid")
        .times(1)
        .returning(|_| Ok(Some(subscription("order.paid", Some("https://hooks.example.com/paid"), true))));
    db.expect_record_delivery()
        .withf(|ev, record| ev == "order.paid" && record.status_code == 200 && record.error_message.is_none())
        .times(1)
        .returning(|_, _| Ok(()));
    let mut transport = MockTransport::new();
    transport
        .expect_deliver()
        .withf(|req| req.url == "https://hooks.example.com/paid" && req.event_type == "order.paid")
        .times(1)
        .returning(|_| Ok(DeliveryResponse { status: 200, body: String::new() }));
    let req = admin_request(TestRequest::post().uri("/admin/orders/42/notify"));
    let (status, body) = send_request(req, configure_notifications(db, transport)).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success, "{}", response.message);
}

#[actix_web::test]
async fn resend_for_unpaid_order_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order().times(1).returning(|_| Ok(Some(pending_order())));
    db.expect_fetch_subscription().never();
    let mut transport = MockTransport::new();
    transport.expect_deliver().never();
    let req = admin_request(TestRequest::post().uri("/admin/orders/42/notify"));
    let (status, _) = send_request(req, configure_notifications(db, transport)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

//----------------------------------------------   User notifications  ------------------------------------------------

#[actix_web::test]
async fn user_created_notification() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_customer_profile()
        .withf(|id| id == "user-1")
        .times(1)
        .returning(|id| Ok(Some(customer(id))));
    db.expect_fetch_subscription()
        .withf(|ev| ev == "user.created")
        .times(1)
        .returning(|_| Ok(Some(subscription("user.created", Some("https://hooks.example.com/users"), true))));
    db.expect_record_delivery().times(1).returning(|_, _| Ok(()));
    let mut transport = MockTransport::new();
    transport
        .expect_deliver()
        .withf(|req| req.event_type == "user.created" && req.body.contains("ana@example.com"))
        .times(1)
        .returning(|_| Ok(DeliveryResponse { status: 202, body: String::new() }));
    let req = admin_request(TestRequest::post().uri("/admin/users/user-1/notify/created"));
    let (status, body) = send_request(req, configure_notifications(db, transport)).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success, "{}", response.message);
}

#[actix_web::test]
async fn user_created_for_unknown_customer() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_customer_profile().times(1).returning(|_| Ok(None));
    db.expect_fetch_subscription().never();
    let mut transport = MockTransport::new();
    transport.expect_deliver().never();
    let req = admin_request(TestRequest::post().uri("/admin/users/user-9/notify/created"));
    let (status, body) = send_request(req, configure_notifications(db, transport)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("user-9"), "{body}");
}

#[actix_web::test]
async fn user_inactive_notification_without_subscription() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_customer_profile().times(1).returning(|id| Ok(Some(customer(id))));
    db.expect_fetch_subscription().withf(|ev| ev == "user.inactive.60d").times(1).returning(|_| Ok(None));
    let mut transport = MockTransport::new();
    transport.expect_deliver().never();
    let req = admin_request(TestRequest::post().uri("/admin/users/user-1/notify/inactive"))
        .set_json(serde_json::json!({ "inactive_days": 60, "last_seen_at": "2024-03-01T12:00:00Z" }));
    let (status, body) = send_request(req, configure_notifications(db, transport)).await;
    assert_eq!(status, StatusCode::OK);
    let response: JsonResponse = serde_json::from_str(&body).unwrap();
    assert!(!response.success);
    assert_eq!(response.message, "There is no active user.inactive.60d subscription");
}

#[actix_web::test]
async fn user_inactive_needs_a_threshold() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_customer_profile().times(1).returning(|id| Ok(Some(customer(id))));
    db.expect_fetch_subscription().never();
    let transport = MockTransport::new();
    let req = admin_request(TestRequest::post().uri("/admin/users/user-1/notify/inactive"))
        .set_json(serde_json::json!({ "inactive_days": 0 }));
    let (status, _) = send_request(req, configure_notifications(db, transport)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
