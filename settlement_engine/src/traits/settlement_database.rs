use chrono::{DateTime, Utc};
use settlement_common::Money;
use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderItem, StatusHistoryEntry},
    traits::data_objects::{PaymentUpdate, StatusUpdate},
};

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Order {0} does not exist")]
    OrderNotFound(String),
    #[error("Invalid request. {0}")]
    ValidationError(String),
    #[error("The requested status change would not change anything")]
    OrderModificationNoOp,
    #[error("Order {0} was modified by someone else in the meantime. Try again.")]
    Superseded(i64),
    #[error("Webhook subscription for {0} does not exist")]
    SubscriptionNotFound(String),
}

impl From<sqlx::Error> for SettlementError {
    fn from(e: sqlx::Error) -> Self {
        SettlementError::DatabaseError(e.to_string())
    }
}

/// Order storage, as needed by the payment flows.
///
/// Implementations must apply [`PaymentUpdate`]s and [`StatusUpdate`]s as compare-and-swap operations: the row is only
/// changed if it is still in the state the caller observed, and the history entry is written in the same transaction.
/// If the row has moved on, nothing is written and `None` is returned.
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase: Clone {
    /// The URL of the database
    fn url(&self) -> &str;

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, SettlementError>;

    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, SettlementError>;

    async fn fetch_order_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, SettlementError>;

    async fn fetch_order_by_external_reference(&self, reference: &str) -> Result<Option<Order>, SettlementError>;

    /// Up to `limit` orders that are pending, unpaid and have a gateway payment id. Oldest first.
    async fn fetch_reconcilable_orders(&self, limit: u32) -> Result<Vec<Order>, SettlementError>;

    /// Unpaid, pending orders created before `cutoff`. Oldest first.
    async fn fetch_unpaid_orders_created_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Order>, SettlementError>;

    /// Applies a payment-driven transition and appends the history entry, atomically. Returns the updated order, or
    /// `None` if the order was no longer in the expected state.
    async fn apply_payment_update(&self, update: PaymentUpdate) -> Result<Option<Order>, SettlementError>;

    /// Applies an operator's status edit and appends the history entry, atomically. Returns the updated order, or
    /// `None` if the order status changed in the meantime.
    async fn apply_status_update(&self, update: StatusUpdate) -> Result<Option<Order>, SettlementError>;

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, SettlementError>;

    /// The order's status history, oldest first.
    async fn fetch_status_history(&self, order_id: i64) -> Result<Vec<StatusHistoryEntry>, SettlementError>;

    /// The current cost price of a product, if the product still exists and has one.
    async fn fetch_product_cost(&self, product_id: i64) -> Result<Option<Money>, SettlementError>;

    /// Stores a new order and its items. Orders start out `pending/pending`. Placing an order is not a transition, so
    /// no history entry is written.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, SettlementError>;
}
