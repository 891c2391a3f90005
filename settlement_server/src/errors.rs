use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use settlement_engine::{NotificationError, SettlementError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("The data was not found. {0}")]
    NoRecordFound(String),
    #[error("The request conflicts with the current state of the resource. {0}")]
    Conflict(String),
    #[error("Authentication Error. {0}")]
    AuthenticationError(#[from] AuthError),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::NoRecordFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::AuthenticationError(e) => match e {
                AuthError::MissingToken => StatusCode::UNAUTHORIZED,
                AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::MissingSignature => StatusCode::UNAUTHORIZED,
                AuthError::InvalidSignature => StatusCode::UNAUTHORIZED,
                AuthError::ForbiddenPeer => StatusCode::FORBIDDEN,
            },
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("No bearer token was provided.")]
    MissingToken,
    #[error("The bearer token is not valid.")]
    InvalidToken,
    #[error("Requests from this address are not allowed.")]
    ForbiddenPeer,
    #[error("No request signature was provided.")]
    MissingSignature,
    #[error("The request signature is not valid.")]
    InvalidSignature,
}

impl From<SettlementError> for ServerError {
    fn from(e: SettlementError) -> Self {
        match e {
            SettlementError::ValidationError(_) => Self::ValidationError(e.to_string()),
            SettlementError::OrderNotFound(_) | SettlementError::SubscriptionNotFound(_) => {
                Self::NoRecordFound(e.to_string())
            },
            SettlementError::OrderModificationNoOp | SettlementError::Superseded(_) => Self::Conflict(e.to_string()),
            SettlementError::DatabaseError(e) => Self::BackendError(format!("Database error: {e}")),
        }
    }
}

impl From<NotificationError> for ServerError {
    fn from(e: NotificationError) -> Self {
        match e {
            NotificationError::Storage(e) => e.into(),
            NotificationError::OrderNotPaid(_) => Self::Conflict(e.to_string()),
            NotificationError::CustomerNotFound(_) => Self::NoRecordFound(e.to_string()),
            NotificationError::Validation(_) => Self::ValidationError(e.to_string()),
            NotificationError::Serialization(e) => Self::BackendError(format!("Could not build the payload. {e}")),
        }
    }
}
