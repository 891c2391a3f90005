use thiserror::Error;

use crate::helpers::{EVENT_HEADER, SIGNATURE_HEADER, TIMESTAMP_HEADER};

/// A fully prepared webhook delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRequest {
    pub url: String,
    pub event_type: String,
    /// Hex HMAC-SHA256 of `body`
    pub signature: String,
    /// RFC 3339
    pub timestamp: String,
    pub body: String,
}

impl WebhookRequest {
    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            (SIGNATURE_HEADER, self.signature.clone()),
            (EVENT_HEADER, self.event_type.clone()),
            (TIMESTAMP_HEADER, self.timestamp.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryResponse {
    pub status: u16,
    pub body: String,
}

impl DeliveryResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced an HTTP response.
#[derive(Debug, Clone, Error)]
pub enum DeliveryError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Timed out: {0}")]
    Timeout(String),
}

#[allow(async_fn_in_trait)]
pub trait WebhookTransport {
    /// POSTs the request. Any HTTP response, whatever its status, is `Ok`.
    async fn deliver(&self, request: &WebhookRequest) -> Result<DeliveryResponse, DeliveryError>;
}
