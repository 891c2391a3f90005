use std::net::IpAddr;

use actix_web::{http::StatusCode, test::TestRequest, web, web::ServiceConfig};
use settlement_common::Secret;
use settlement_engine::{
    db_types::{HistorySource, OrderStatusType, PaymentStatusType},
    events::EventProducers,
    helpers::calculate_hmac,
    traits::SettlementError,
    OrderFlowApi,
};

use super::{
    helpers::{paid_order, pending_order, send_request},
    mocks::MockSettlementDb,
};
use crate::{
    config::ServerOptions,
    data_objects::PaymentWebhookResponse,
    middleware::{HmacMiddlewareFactory, PeerWhitelistMiddlewareFactory, NOTIFICATION_SIGNATURE_HEADER},
    routes::PaymentWebhookRoute,
};

const NOTIFIER_SECRET: &str = "notifier-shared-secret";

fn configure(db: MockSettlementDb, hmac_checks: bool) -> impl FnOnce(&mut ServiceConfig) {
    move |cfg| {
        let api = OrderFlowApi::new(db, EventProducers::default());
        let hmac = HmacMiddlewareFactory::new(
            NOTIFICATION_SIGNATURE_HEADER,
            Secret::new(NOTIFIER_SECRET.to_string()),
            hmac_checks,
        );
        cfg.app_data(web::Data::new(ServerOptions { use_x_forwarded_for: false, use_forwarded: false }))
            .app_data(web::Data::new(api))
            .service(web::scope("/webhooks").wrap(hmac).service(PaymentWebhookRoute::<MockSettlementDb>::new()));
    }
}

fn configure_with_whitelist(db: MockSettlementDb, whitelist: &str) -> impl FnOnce(&mut ServiceConfig) {
    let whitelist: Vec<IpAddr> = vec![whitelist.parse().unwrap()];
    move |cfg| {
        let api = OrderFlowApi::new(db, EventProducers::default());
        let options = ServerOptions { use_x_forwarded_for: true, use_forwarded: false };
        let hmac = HmacMiddlewareFactory::new(NOTIFICATION_SIGNATURE_HEADER, Secret::default(), false);
        cfg.app_data(web::Data::new(options)).app_data(web::Data::new(api)).service(
            web::scope("/webhooks")
                .wrap(hmac)
                .wrap(PeerWhitelistMiddlewareFactory::new(Some(whitelist), options))
                .service(PaymentWebhookRoute::<MockSettlementDb>::new()),
        );
    }
}

fn notification(body: &str) -> TestRequest {
    TestRequest::post()
        .uri("/webhooks/payment")
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string())
}

#[actix_web::test]
async fn approved_payment_marks_order_paid() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_payment_id()
        .withf(|id| id == "pay-1042")
        .times(1)
        .returning(|_| Ok(Some(pending_order())));
    db.expect_apply_payment_update()
        .withf(|u| {
            u.order_id == 42
                && u.expected_status == OrderStatusType::Pending
                && u.expected_payment_status == PaymentStatusType::Pending
                && u.status == OrderStatusType::Processing
                && u.payment_status == PaymentStatusType::Paid
                && u.payment_id.as_deref() == Some("pay-1042")
                && u.payment_method.as_deref() == Some("pix")
                && u.source == HistorySource::Notification
        })
        .times(1)
        .returning(|_| Ok(Some(paid_order())));
    let req = notification(r#"{"paymentId":"pay-1042","status":"approved","payment_method":"pix"}"#);
    let (status, body) = send_request(req, configure(db, false)).await;
    assert_eq!(status, StatusCode::OK);
    let response: PaymentWebhookResponse = serde_json::from_str(&body).unwrap();
    assert!(response.success);
    assert_eq!(response.message, "updated");
    assert_eq!(response.order_number, "ORD-1042");
    assert_eq!(response.status, OrderStatusType::Processing);
    assert_eq!(response.payment_status, PaymentStatusType::Paid);
}

#[actix_web::test]
async fn numeric_payment_ids_are_accepted() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_payment_id().withf(|id| id == "98765").times(1).returning(|_| Ok(Some(paid_order())));
    let req = notification(r#"{"paymentId":98765,"status":"approved"}"#);
    let (status, _) = send_request(req, configure(db, false)).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn duplicate_notification_is_a_no_op() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_payment_id().times(1).returning(|_| Ok(Some(paid_order())));
    db.expect_apply_payment_update().never();
    let req = notification(r#"{"paymentId":"pay-1042","status":"rejected"}"#);
    let (status, body) = send_request(req, configure(db, false)).await;
    assert_eq!(status, StatusCode::OK);
    let response: PaymentWebhookResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.message, "no-op, already settled");
    assert_eq!(response.payment_status, PaymentStatusType::Paid);
}

#[actix_web::test]
async fn still_pending_leaves_order_alone() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_payment_id().times(1).returning(|_| Ok(Some(pending_order())));
    db.expect_apply_payment_update().never();
    let req = notification(r#"{"paymentId":"pay-1042","status":"in_process"}"#);
    let (status, body) = send_request(req, configure(db, false)).await;
    assert_eq!(status, StatusCode::OK);
    let response: PaymentWebhookResponse = serde_json::from_str(&body).unwrap();
    assert!(response.message.starts_with("no-op, "), "{}", response.message);
    assert_eq!(response.status, OrderStatusType::Pending);
}

#[actix_web::test]
async fn falls_back_to_external_reference() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_payment_id().times(1).returning(|_| Ok(None));
    db.expect_fetch_order_by_external_reference()
        .withf(|r| r == "ORD-1042")
        .times(1)
        .returning(|_| Ok(Some(pending_order())));
    db.expect_apply_payment_update()
        .withf(|u| u.status == OrderStatusType::Cancelled && u.payment_status == PaymentStatusType::Failed)
        .times(1)
        .returning(|_| {
            let mut order = pending_order();
            order.status = OrderStatusType::Cancelled;
            order.payment_status = PaymentStatusType::Failed;
            Ok(Some(order))
        });
    let req = notification(r#"{"paymentId":"pay-9","status":"rejected","external_reference":"ORD-1042"}"#);
    let (status, body) = send_request(req, configure(db, false)).await;
    assert_eq!(status, StatusCode::OK);
    let response: PaymentWebhookResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.status, OrderStatusType::Cancelled);
    assert_eq!(response.payment_status, PaymentStatusType::Failed);
}

#[actix_web::test]
async fn missing_payment_id() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_payment_id().never();
    let req = notification(r#"{"status":"approved"}"#);
    let (status, body) = send_request(req, configure(db, false)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("paymentId is required"), "{body}");
}

#[actix_web::test]
async fn missing_status() {
    let _ = env_logger::try_init().ok();
    let db = MockSettlementDb::new();
    let req = notification(r#"{"paymentId":"pay-1042"}"#);
    let (status, body) = send_request(req, configure(db, false)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("status is required"), "{body}");
}

#[actix_web::test]
async fn malformed_body() {
    let _ = env_logger::try_init().ok();
    let db = MockSettlementDb::new();
    let (status, _) = send_request(notification("paymentId=pay-1042"), configure(db, false)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_order() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_payment_id().times(1).returning(|_| Ok(None));
    db.expect_fetch_order_by_external_reference().never();
    let req = notification(r#"{"paymentId":"pay-404","status":"approved"}"#);
    let (status, body) = send_request(req, configure(db, false)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("pay-404"), "{body}");
}

#[actix_web::test]
async fn persistence_failure_is_a_server_error() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_payment_id().times(1).returning(|_| Ok(Some(pending_order())));
    db.expect_apply_payment_update()
        .times(1)
        .returning(|_| Err(SettlementError::DatabaseError("database is locked".into())));
    let req = notification(r#"{"paymentId":"pay-1042","status":"approved"}"#);
    let (status, _) = send_request(req, configure(db, false)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[actix_web::test]
async fn unsigned_notification_is_rejected() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_payment_id().never();
    let req = notification(r#"{"paymentId":"pay-1042","status":"approved"}"#);
    let (status, body) = send_request(req, configure(db, true)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, r#"{"error":"Authentication Error. No request signature was provided."}"#);
}

#[actix_web::test]
async fn badly_signed_notification_is_rejected() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_payment_id().never();
    let body = r#"{"paymentId":"pay-1042","status":"approved"}"#;
    let signature = calculate_hmac("some-other-secret", body.as_bytes());
    let req = notification(body).insert_header((NOTIFICATION_SIGNATURE_HEADER, signature));
    let (status, _) = send_request(req, configure(db, true)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn signed_notification_is_processed() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_payment_id().times(1).returning(|_| Ok(Some(pending_order())));
    db.expect_apply_payment_update().times(1).returning(|_| Ok(Some(paid_order())));
    let body = r#"{"paymentId":"pay-1042","status":"approved"}"#;
    let signature = calculate_hmac(NOTIFIER_SECRET, body.as_bytes());
    let req = notification(body).insert_header((NOTIFICATION_SIGNATURE_HEADER, signature));
    let (status, body) = send_request(req, configure(db, true)).await;
    assert_eq!(status, StatusCode::OK);
    let response: PaymentWebhookResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(response.message, "updated");
}

#[actix_web::test]
async fn notification_from_unlisted_peer_is_forbidden() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_payment_id().never();
    let req = notification(r#"{"paymentId":"pay-1042","status":"approved"}"#)
        .peer_addr("10.0.0.5:4321".parse().unwrap());
    let (status, body) = send_request(req, configure_with_whitelist(db, "10.0.0.1")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body, r#"{"error":"Authentication Error. Requests from this address are not allowed."}"#);
}

#[actix_web::test]
async fn notification_from_listed_peer_is_processed() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_payment_id().times(1).returning(|_| Ok(Some(paid_order())));
    let req = notification(r#"{"paymentId":"pay-1042","status":"approved"}"#)
        .peer_addr("10.0.0.1:4321".parse().unwrap());
    let (status, _) = send_request(req, configure_with_whitelist(db, "10.0.0.1")).await;
    assert_eq!(status, StatusCode::OK);
}

#[actix_web::test]
async fn forwarded_client_address_is_checked_against_whitelist() {
    let _ = env_logger::try_init().ok();
    let mut db = MockSettlementDb::new();
    db.expect_fetch_order_by_payment_id().never();
    let req = notification(r#"{"paymentId":"pay-1042","status":"approved"}"#)
        .peer_addr("10.0.0.1:4321".parse().unwrap())
        .insert_header(("X-Forwarded-For", "203.0.113.9, 10.0.0.1"));
    let (status, _) = send_request(req, configure_with_whitelist(db, "10.0.0.1")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
