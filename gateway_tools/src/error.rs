use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayApiError {
    #[error("Could not initialize client: {0}")]
    Initialization(String),
    #[error("Invalid payment reference: {0}")]
    InvalidReference(String),
    #[error("The request timed out: {0}")]
    Timeout(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("The gateway rejected our credentials. Status {0}")]
    Unauthorized(u16),
    #[error("The gateway does not know about payment {0}")]
    UnknownReference(String),
    #[error("Query failed. Error {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("Could not deserialize JSON: {0}")]
    JsonError(String),
}

impl GatewayApiError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_builder() {
            Self::Initialization(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}
