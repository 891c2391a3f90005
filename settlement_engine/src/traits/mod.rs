//! # Backend and collaborator contracts
//!
//! The engine never talks to storage or the outside world directly. Everything goes through the traits in this
//! module, which keeps the order-flow logic testable with in-memory fakes or mocks.
//!
//! Storage:
//! * [`SettlementDatabase`] reads orders and their items, and applies payment and admin transitions as conditional
//!   updates with an accompanying history entry.
//! * [`WebhookManagement`] stores webhook subscriptions and their delivery bookkeeping.
//! * [`CustomerDirectory`] looks up registered customer profiles and reseller storefronts.
//!
//! Outside collaborators:
//! * [`PaymentStatusProvider`] asks the payment gateway about a payment.
//! * [`WebhookTransport`] POSTs a signed body to a subscriber.
//! * [`LabelUrlSigner`] issues time-limited download links for uploaded shipping labels.
mod customer_directory;
mod data_objects;
mod label_signer;
mod payment_status_provider;
mod settlement_database;
mod webhook_management;
mod webhook_transport;

pub use customer_directory::CustomerDirectory;
pub use data_objects::{DeliveryRecord, PaymentUpdate, StatusUpdate, SubscriptionUpdate};
pub use label_signer::{LabelUrlSigner, SignedLabelUrl};
pub use payment_status_provider::{GatewayError, PaymentStatusProvider};
pub use settlement_database::{SettlementDatabase, SettlementError};
pub use webhook_management::WebhookManagement;
pub use webhook_transport::{DeliveryError, DeliveryResponse, WebhookRequest, WebhookTransport};

/// Everything the notification flow needs from storage.
pub trait NotificationBackend: SettlementDatabase + WebhookManagement + CustomerDirectory {}

impl<T> NotificationBackend for T where T: SettlementDatabase + WebhookManagement + CustomerDirectory {}
