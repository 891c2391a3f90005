use gateway_tools::{GatewayApiError, GatewayConfig, PaymentGatewayApi};
use settlement_common::PaymentStatusReport;
use settlement_engine::traits::{GatewayError, PaymentStatusProvider};

/// Exposes the REST gateway client to the engine as a [`PaymentStatusProvider`].
#[derive(Clone)]
pub struct GatewayStatusAdapter {
    api: PaymentGatewayApi,
}

impl GatewayStatusAdapter {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let api = PaymentGatewayApi::new(config)?;
        Ok(Self { api })
    }
}

impl PaymentStatusProvider for GatewayStatusAdapter {
    async fn fetch_status(&self, payment_reference: &str) -> Result<PaymentStatusReport, GatewayError> {
        self.api.fetch_status(payment_reference).await.map_err(to_gateway_error)
    }
}

pub fn to_gateway_error(e: GatewayApiError) -> GatewayError {
    match e {
        GatewayApiError::Timeout(s) => GatewayError::Timeout(s),
        GatewayApiError::Network(s) => GatewayError::Network(s),
        GatewayApiError::UnknownReference(s) | GatewayApiError::InvalidReference(s) => {
            GatewayError::UnknownReference(s)
        },
        GatewayApiError::Unauthorized(status) => GatewayError::Unauthorized(format!("HTTP {status}")),
        GatewayApiError::QueryError { status, message } => GatewayError::Rejected { status, message },
        GatewayApiError::JsonError(s) => GatewayError::MalformedResponse(s),
        GatewayApiError::Initialization(s) => GatewayError::Network(s),
    }
}
