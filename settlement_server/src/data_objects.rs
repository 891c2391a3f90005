use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use settlement_common::{GatewayStatus, Money};
use settlement_engine::{
    db_types::{Order, OrderStatusType, PaymentStatusType},
    NotificationOutcome,
    PaymentNotification,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The body of a payment notification, as posted by the payment notifier.
///
/// Every field is optional at this level so that missing values can be reported as validation errors rather than
/// deserialization failures. Notifiers send `paymentId` as either a string or a number.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentWebhookRequest {
    #[serde(rename = "paymentId", alias = "payment_id", default, deserialize_with = "string_or_number")]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount: Option<Money>,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl From<PaymentWebhookRequest> for PaymentNotification {
    fn from(req: PaymentWebhookRequest) -> Self {
        let status = GatewayStatus::from(req.status.as_deref().unwrap_or_default());
        let mut notification = PaymentNotification::new(req.payment_id.unwrap_or_default(), status);
        notification.amount = req.amount;
        notification.external_reference = req.external_reference;
        notification.payment_method = req.payment_method;
        notification
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where D: Deserializer<'de> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// The answer to a payment notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentWebhookResponse {
    pub success: bool,
    pub message: String,
    pub order_number: String,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatusType,
}

impl PaymentWebhookResponse {
    fn for_order(order: &Order, message: String) -> Self {
        Self {
            success: true,
            message,
            order_number: order.order_number.clone(),
            status: order.status,
            payment_status: order.payment_status,
        }
    }
}

impl From<&NotificationOutcome> for PaymentWebhookResponse {
    fn from(outcome: &NotificationOutcome) -> Self {
        let message = match outcome {
            NotificationOutcome::AlreadySettled(_) => "no-op, already settled".to_string(),
            NotificationOutcome::Updated(_) => "updated".to_string(),
            NotificationOutcome::Unchanged { reason, .. } => format!("no-op, {reason}"),
            NotificationOutcome::Superseded(_) => "no-op, updated concurrently".to_string(),
        };
        Self::for_order(outcome.order(), message)
    }
}

/// Body of `POST /admin/orders/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChangeRequest {
    pub status: OrderStatusType,
    #[serde(default)]
    pub note: Option<String>,
}

/// Body of `POST /admin/users/{user_id}/notify/inactive`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInactiveRequest {
    pub inactive_days: u32,
    #[serde(default)]
    pub last_seen_at: Option<DateTime<Utc>>,
}

/// Body of `PUT /admin/webhooks/{event_type}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfigRequest {
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// A freshly rotated secret. This is the only time the full secret is ever returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotatedSecret {
    pub event_type: String,
    pub secret_token: String,
}
