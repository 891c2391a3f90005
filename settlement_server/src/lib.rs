//! # Settlement server
//! This crate hosts the HTTP front end of the settlement engine. It is responsible for:
//! * Receiving payment notifications from the payment notifier and feeding them into the order state machine.
//! * Running reconciliation against the payment gateway on a timer, and expiring orders that were never paid.
//! * Delivering signed `order.paid` webhooks to integrators when an order is paid.
//! * Serving the admin console: fee breakdowns, status history, status edits and webhook subscriptions.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhooks/payment`: Inbound payment notifications.
//! * `/admin/...`: Admin routes. These require the `SPG_ADMIN_TOKEN` bearer token.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod reconciliation_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
