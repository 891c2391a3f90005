//! Settlement Engine
//!
//! The order payment lifecycle and settlement notification core of the marketplace. It is storage- and
//! provider-agnostic: everything it needs from the outside world is expressed as a trait in [`mod@traits`].
//!
//! The library is divided into a few sections:
//! 1. Pure domain logic. [`mod@fees`] decomposes sales into fees and profit, and [`mod@order_state`] decides how an
//!    order responds to a payment trigger.
//! 2. The public APIs. [`OrderFlowApi`] applies payment transitions, [`ReconciliationApi`] pulls status from the
//!    payment gateway, [`NotificationApi`] signs and delivers webhooks, and [`WebhookApi`] and [`SettlementApi`] serve
//!    the admin console.
//! 3. Storage. The SQLite backend ([`SqliteDatabase`]) implements the storage traits. You should never need to touch
//!    the database directly.
//!
//! The engine emits events when orders are paid or annulled. Hook into them with [`events::EventHooks`] to run
//! custom actions, such as dispatching the `order.paid` webhook.
#[cfg(feature = "sqlite")]
mod sqlite;

pub mod db_types;
pub mod events;
pub mod fees;
pub mod helpers;
pub mod order_state;
mod se_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use se_api::{
    errors::NotificationError,
    notification_api::{DispatchOutcome, NotificationApi},
    order_flow_api::{NotificationOutcome, OrderFlowApi, PaymentDetails, PaymentNotification, TransitionOutcome},
    reconciliation_api::ReconciliationApi,
    reconciliation_objects,
    settlement_api::SettlementApi,
    webhook_api::WebhookApi,
    webhook_payloads,
};
pub use traits::{
    CustomerDirectory,
    NotificationBackend,
    PaymentStatusProvider,
    SettlementDatabase,
    SettlementError,
    WebhookManagement,
    WebhookTransport,
};
