use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Money;

//--------------------------------------   GatewayStatus    ---------------------------------------------------------
/// The payment status reported by the external payment gateway (or a notifier relaying it).
///
/// Raw status strings are converted into this enum as soon as they cross into the system, so that nothing downstream
/// has to match on free-form text. Anything we don't recognise is kept verbatim in [`GatewayStatus::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GatewayStatus {
    /// The payment was approved and the funds captured.
    Approved,
    /// The customer has not completed the payment yet.
    Pending,
    /// The payment is being reviewed by the gateway.
    InProcess,
    /// The payment was rejected.
    Rejected,
    /// The payment was cancelled, by the customer or the gateway.
    Cancelled,
    Unknown(String),
}

impl From<&str> for GatewayStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "approved" => Self::Approved,
            "pending" => Self::Pending,
            "in_process" => Self::InProcess,
            "rejected" => Self::Rejected,
            "cancelled" => Self::Cancelled,
            _ => Self::Unknown(value.trim().to_string()),
        }
    }
}

impl From<String> for GatewayStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl Display for GatewayStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Approved => write!(f, "approved"),
            Self::Pending => write!(f, "pending"),
            Self::InProcess => write!(f, "in_process"),
            Self::Rejected => write!(f, "rejected"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Unknown(s) => write!(f, "{s}"),
        }
    }
}

impl Serialize for GatewayStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GatewayStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

impl GatewayStatus {
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

//-------------------------------------- PaymentStatusReport ---------------------------------------------------------
/// The result of asking the gateway about a single payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentStatusReport {
    pub payment_reference: String,
    pub status: GatewayStatus,
    pub status_detail: Option<String>,
    pub amount: Option<Money>,
    pub approved_at: Option<DateTime<Utc>>,
    pub external_reference: Option<String>,
}

impl PaymentStatusReport {
    pub fn new<S: Into<String>>(payment_reference: S, status: GatewayStatus) -> Self {
        Self {
            payment_reference: payment_reference.into(),
            status,
            status_detail: None,
            amount: None,
            approved_at: None,
            external_reference: None,
        }
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }
}
