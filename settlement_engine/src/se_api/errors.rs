use thiserror::Error;

use crate::traits::SettlementError;

#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("{0}")]
    Storage(#[from] SettlementError),
    #[error("Could not serialize the webhook payload. {0}")]
    Serialization(String),
    #[error("Order {0} has not been paid. Paid notifications can only be sent for paid orders.")]
    OrderNotPaid(String),
    #[error("Customer {0} does not exist.")]
    CustomerNotFound(String),
    #[error("Invalid notification request. {0}")]
    Validation(String),
}

impl From<serde_json::Error> for NotificationError {
    fn from(e: serde_json::Error) -> Self {
        NotificationError::Serialization(e.to_string())
    }
}
