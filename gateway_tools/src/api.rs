use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
    Method,
    StatusCode,
    Url,
};
use serde::de::DeserializeOwned;
use settlement_common::PaymentStatusReport;

use crate::{config::GatewayConfig, data_objects::GatewayPayment, GatewayApiError};

#[derive(Clone)]
pub struct PaymentGatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl PaymentGatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.access_token.reveal());
        let mut val = HeaderValue::from_str(&bearer).map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        val.set_sensitive(true);
        headers.insert(AUTHORIZATION, val);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Builds `{base_url}/v1/payments/{reference}`, percent-encoding the reference.
    pub fn payment_url(&self, payment_reference: &str) -> Result<Url, GatewayApiError> {
        let reference = payment_reference.trim();
        if reference.is_empty() {
            return Err(GatewayApiError::InvalidReference("payment reference is empty".to_string()));
        }
        let mut url =
            Url::parse(&self.config.base_url).map_err(|e| GatewayApiError::Initialization(format!("{e}")))?;
        url.path_segments_mut()
            .map_err(|_| GatewayApiError::Initialization(format!("{} cannot be a base url", self.config.base_url)))?
            .pop_if_empty()
            .extend(["v1", "payments", reference]);
        Ok(url)
    }

    async fn rest_query<T: DeserializeOwned>(&self, method: Method, url: Url) -> Result<T, GatewayApiError> {
        trace!("💳️ Sending REST query: {method} {url}");
        let response = self.client.request(method, url).send().await.map_err(GatewayApiError::from_reqwest)?;
        let status = response.status();
        if status.is_success() {
            trace!("💳️ REST query successful. {status}");
            let body = response.text().await.map_err(GatewayApiError::from_reqwest)?;
            serde_json::from_str::<T>(&body).map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let message = response.text().await.unwrap_or_else(|e| format!("<unreadable body: {e}>"));
            Err(GatewayApiError::QueryError { status: status.as_u16(), message })
        }
    }

    /// Fetches the current status of the payment with the given gateway reference.
    ///
    /// Every non-2xx response and every body that can't be parsed is an error. The status is never defaulted.
    pub async fn fetch_status(&self, payment_reference: &str) -> Result<PaymentStatusReport, GatewayApiError> {
        let url = self.payment_url(payment_reference)?;
        debug!("💳️ Fetching gateway status for payment {payment_reference}");
        let payment =
            self.rest_query::<GatewayPayment>(Method::GET, url).await.map_err(|e| match e {
                GatewayApiError::QueryError { status, .. } if status == StatusCode::NOT_FOUND.as_u16() => {
                    GatewayApiError::UnknownReference(payment_reference.to_string())
                },
                GatewayApiError::QueryError { status, .. }
                    if status == StatusCode::UNAUTHORIZED.as_u16() || status == StatusCode::FORBIDDEN.as_u16() =>
                {
                    GatewayApiError::Unauthorized(status)
                },
                e => e,
            })?;
        let report = payment.into_report();
        info!("💳️ Gateway reports payment {payment_reference} as {}", report.status);
        Ok(report)
    }
}
