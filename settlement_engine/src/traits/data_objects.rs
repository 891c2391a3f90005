use chrono::{DateTime, Utc};

use crate::db_types::{HistorySource, OrderStatusType, PaymentStatusType};

/// A compare-and-swap update of an order's payment state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentUpdate {
    pub order_id: i64,
    pub expected_status: OrderStatusType,
    pub expected_payment_status: PaymentStatusType,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatusType,
    /// Recorded only if the order doesn't have one yet
    pub payment_id: Option<String>,
    /// Overwrites the stored payment method when present
    pub payment_method: Option<String>,
    pub source: HistorySource,
    pub note: String,
}

/// An operator's edit of the order status. Payment status is never touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub order_id: i64,
    pub expected_status: OrderStatusType,
    pub status: OrderStatusType,
    pub note: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionUpdate {
    pub event_type: String,
    /// `Some("")` clears the URL. `None` leaves it alone.
    pub webhook_url: Option<String>,
    pub active: Option<bool>,
}

/// The outcome of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryRecord {
    pub triggered_at: DateTime<Utc>,
    /// The HTTP status, or 0 if no response was received
    pub status_code: i64,
    /// `None` on success
    pub error_message: Option<String>,
}

impl DeliveryRecord {
    pub const NETWORK_FAILURE: i64 = 0;
}
