//! Outbound HTTP plumbing for the settlement service.
//!
//! * [`PaymentGatewayApi`] queries the external payment gateway for the current status of a payment.
//! * [`WebhookClient`] delivers signed webhook bodies to integrator endpoints.
//!
//! Neither client retries. Retry policy belongs to the callers.
mod api;
mod config;
mod data_objects;
mod error;
mod webhook_client;

pub use api::PaymentGatewayApi;
pub use config::GatewayConfig;
pub use data_objects::GatewayPayment;
pub use error::GatewayApiError;
pub use webhook_client::{WebhookClient, WebhookResponse};
