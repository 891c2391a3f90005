use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use settlement_common::{GatewayStatus, Money, PaymentStatusReport};

/// A payment record, as returned by `GET /v1/payments/{id}`.
///
/// Only the fields the settlement service cares about are modelled. Anything else in the response is ignored.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GatewayPayment {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub status_detail: Option<String>,
    #[serde(default)]
    pub transaction_amount: Option<Money>,
    #[serde(default)]
    pub date_approved: Option<DateTime<Utc>>,
    #[serde(default)]
    pub external_reference: Option<String>,
}

impl GatewayPayment {
    /// Converts the raw gateway record into a [`PaymentStatusReport`]. This is where the free-form status string is
    /// turned into a [`GatewayStatus`].
    pub fn into_report(self) -> PaymentStatusReport {
        PaymentStatusReport {
            payment_reference: self.id,
            status: GatewayStatus::from(self.status),
            status_detail: self.status_detail,
            amount: self.transaction_amount,
            approved_at: self.date_approved,
            external_reference: self.external_reference.filter(|s| !s.is_empty()),
        }
    }
}

/// Gateways disagree on whether ids are numbers or strings, so accept both.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        v => Err(serde::de::Error::custom(format!("expected a string or number id, got {v}"))),
    }
}
