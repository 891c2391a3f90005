use std::time::Duration;

use gateway_tools::{GatewayApiError, WebhookClient};
use settlement_engine::traits::{DeliveryError, DeliveryResponse, WebhookRequest, WebhookTransport};

/// Delivers signed webhook bodies over HTTP.
#[derive(Clone)]
pub struct HttpWebhookTransport {
    client: WebhookClient,
}

impl HttpWebhookTransport {
    pub fn new(timeout: Duration) -> Result<Self, GatewayApiError> {
        Ok(Self { client: WebhookClient::new(timeout)? })
    }
}

impl WebhookTransport for HttpWebhookTransport {
    async fn deliver(&self, request: &WebhookRequest) -> Result<DeliveryResponse, DeliveryError> {
        let headers = request.headers();
        let headers = headers.iter().map(|(name, value)| (*name, value.clone())).collect::<Vec<_>>();
        let response = self.client.post(&request.url, &headers, request.body.clone()).await.map_err(|e| match e {
            GatewayApiError::Timeout(s) => DeliveryError::Timeout(s),
            e => DeliveryError::Network(e.to_string()),
        })?;
        Ok(DeliveryResponse { status: response.status, body: response.body })
    }
}
