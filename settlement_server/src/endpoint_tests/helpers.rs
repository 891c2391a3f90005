use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::{TimeZone, Utc};
use log::debug;
use settlement_common::{Money, Secret};
use settlement_engine::db_types::{Order, OrderStatusType, PaymentStatusType, WebhookSubscription};

pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Sends `req` to an app set up by `configure`, and returns the status code and body. Errors raised by middleware
/// are rendered the same way actix would render them for a live client.
pub async fn send_request<F>(req: TestRequest, configure: F) -> (StatusCode, String)
where F: FnOnce(&mut ServiceConfig) {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req.to_request()).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => {
            let res = e.error_response();
            let status = res.status();
            let body = res.into_body().try_into_bytes().unwrap();
            (status, String::from_utf8_lossy(&body).into_owned())
        },
    }
}

pub fn admin_request(req: TestRequest) -> TestRequest {
    req.insert_header(("Authorization", format!("Bearer {ADMIN_TOKEN}")))
}

pub fn admin_secret() -> Secret<String> {
    Secret::new(ADMIN_TOKEN.to_string())
}

pub fn pending_order() -> Order {
    let created = Utc.with_ymd_and_hms(2024, 5, 3, 14, 30, 0).unwrap();
    Order {
        id: 42,
        order_number: "ORD-1042".into(),
        user_id: None,
        customer_name: Some("Ana Souza".into()),
        customer_email: Some("ana@example.com".into()),
        customer_phone: None,
        reseller_id: None,
        status: OrderStatusType::Pending,
        payment_status: PaymentStatusType::Pending,
        payment_id: Some("pay-1042".into()),
        external_reference: Some("ORD-1042".into()),
        payment_method: None,
        total_amount: Money::from_cents(11_500),
        shipping_amount: Money::from_cents(1_000),
        tax_amount: Money::from_cents(500),
        shipping_label_path: None,
        created_at: created,
        updated_at: created,
    }
}

pub fn paid_order() -> Order {
    Order {
        status: OrderStatusType::Processing,
        payment_status: PaymentStatusType::Paid,
        payment_method: Some("pix".into()),
        ..pending_order()
    }
}

pub fn subscription(event_type: &str, url: Option<&str>, active: bool) -> WebhookSubscription {
    let created = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    WebhookSubscription {
        id: 1,
        event_type: event_type.into(),
        webhook_url: url.map(String::from),
        active,
        secret_token: Secret::new("0123456789abcdef".to_string()),
        last_triggered_at: None,
        last_status_code: None,
        last_error_message: None,
        created_at: created,
        updated_at: created,
    }
}
