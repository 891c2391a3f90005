use std::{fmt::Display, time::Duration};

use serde::{Deserialize, Serialize};

use crate::db_types::{OrderStatusType, PaymentStatusType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconciliationConfig {
    /// The maximum number of orders checked per run
    pub batch_size: u32,
    /// An upper bound on each gateway call, on top of whatever timeout the gateway client enforces itself
    pub gateway_timeout: Duration,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self { batch_size: 50, gateway_timeout: Duration::from_secs(10) }
    }
}

/// What happened to a single order during a reconciliation run. Serialized as a plain string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    Updated,
    /// The gateway status didn't call for a change. The value is the no-op reason, e.g. `still_pending` or
    /// `unknown_status_charged_back`.
    Unchanged(String),
    Superseded,
    GatewayError,
    PersistenceError,
}

impl ReconciliationOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::GatewayError | Self::PersistenceError)
    }
}

impl From<&str> for ReconciliationOutcome {
    fn from(value: &str) -> Self {
        match value {
            "updated" => Self::Updated,
            "superseded" => Self::Superseded,
            "gateway_error" => Self::GatewayError,
            "persistence_error" => Self::PersistenceError,
            reason => Self::Unchanged(reason.to_string()),
        }
    }
}

impl Serialize for ReconciliationOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ReconciliationOutcome {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s.as_str()))
    }
}

impl Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Updated => write!(f, "updated"),
            Self::Unchanged(reason) => write!(f, "{reason}"),
            Self::Superseded => write!(f, "superseded"),
            Self::GatewayError => write!(f, "gateway_error"),
            Self::PersistenceError => write!(f, "persistence_error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationDetail {
    pub order_id: i64,
    pub order_number: String,
    pub payment_id: String,
    pub outcome: ReconciliationOutcome,
    /// The new status, for updated orders
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatusType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<PaymentStatusType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The summary of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub checked: u32,
    pub updated: u32,
    pub errors: u32,
    pub details: Vec<ReconciliationDetail>,
}

impl ReconciliationReport {
    pub fn record(&mut self, detail: ReconciliationDetail) {
        self.checked += 1;
        if detail.outcome == ReconciliationOutcome::Updated {
            self.updated += 1;
        }
        if detail.outcome.is_error() {
            self.errors += 1;
        }
        self.details.push(detail);
    }

    pub fn detail_for(&self, order_number: &str) -> Option<&ReconciliationDetail> {
        self.details.iter().find(|d| d.order_number == order_number)
    }
}

impl Display for ReconciliationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} checked, {} updated, {} errors", self.checked, self.updated, self.errors)
    }
}
