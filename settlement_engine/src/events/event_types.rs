use serde::{Deserialize, Serialize};

use crate::{db_types::Order, order_state::PaymentTransition};

/// Emitted exactly once per order, by whichever path first moved its payment status to `paid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted for every effective payment-driven transition that did not result in a payment, e.g. failed or expired
/// payments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub transition: PaymentTransition,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order, transition: PaymentTransition) -> Self {
        Self { order, transition }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderPaid(OrderPaidEvent),
    OrderAnnulled(OrderAnnulledEvent),
}
