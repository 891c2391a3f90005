use settlement_common::PaymentStatusReport;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Could not reach the payment gateway. {0}")]
    Network(String),
    #[error("The payment gateway did not answer in time. {0}")]
    Timeout(String),
    #[error("The payment gateway does not know payment {0}")]
    UnknownReference(String),
    #[error("The payment gateway refused our credentials. {0}")]
    Unauthorized(String),
    #[error("The payment gateway returned status {status}. {message}")]
    Rejected { status: u16, message: String },
    #[error("The payment gateway response could not be understood. {0}")]
    MalformedResponse(String),
}

/// The source of truth for payment status.
///
/// Implementations make a single attempt per call. Callers decide whether and when to try again.
#[allow(async_fn_in_trait)]
pub trait PaymentStatusProvider {
    async fn fetch_status(&self, payment_reference: &str) -> Result<PaymentStatusReport, GatewayError>;
}
