use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{header::CONTENT_TYPE, Client};

use crate::GatewayApiError;

/// The part of a subscriber's response that we keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: String,
}

impl WebhookResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A thin HTTP client for delivering webhook bodies.
///
/// Any HTTP response, including non-2xx ones, is returned as `Ok`. Only transport failures (DNS, refused
/// connections, timeouts) are errors.
#[derive(Clone)]
pub struct WebhookClient {
    client: Arc<Client>,
}

/// Subscriber response bodies are truncated to this many bytes before being kept.
const MAX_BODY_EXCERPT: usize = 512;

impl WebhookClient {
    pub fn new(timeout: Duration) -> Result<Self, GatewayApiError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { client: Arc::new(client) })
    }

    pub async fn post(
        &self,
        url: &str,
        headers: &[(&str, String)],
        body: String,
    ) -> Result<WebhookResponse, GatewayApiError> {
        trace!("📮️ POST {url} ({} bytes)", body.len());
        let mut req = self.client.post(url).header(CONTENT_TYPE, "application/json").body(body);
        for (name, value) in headers {
            req = req.header(*name, value.as_str());
        }
        let response = req.send().await.map_err(GatewayApiError::from_reqwest)?;
        let status = response.status().as_u16();
        let mut body = response.text().await.unwrap_or_default();
        if body.len() > MAX_BODY_EXCERPT {
            let mut end = MAX_BODY_EXCERPT;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }
        debug!("📮️ {url} responded with {status}");
        Ok(WebhookResponse { status, body })
    }
}
