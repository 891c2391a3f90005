//! # Settlement engine APIs
//!
//! The entry points that the server (or any other front end) calls into. Each API is generic over the storage and
//! collaborator traits it needs, so that the same flows run against SQLite in production and fakes in tests.
//!
//! * [`OrderFlowApi`] moves orders through the payment state machine.
//! * [`ReconciliationApi`] pulls payment status from the gateway for pending orders.
//! * [`NotificationApi`] builds, signs and delivers webhook payloads.
//! * [`WebhookApi`] manages webhook subscriptions.
//! * [`SettlementApi`] serves order, history and fee breakdown queries.
pub mod errors;
pub mod notification_api;
pub mod order_flow_api;
pub mod reconciliation_api;
pub mod reconciliation_objects;
pub mod settlement_api;
pub mod webhook_api;
pub mod webhook_payloads;
