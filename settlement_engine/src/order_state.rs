//! The payment-driven order state machine.
//!
//! [`transition`] is a pure function. It decides what should happen to an order when a payment trigger arrives, but
//! it doesn't touch storage. Applying the result (conditional row update, history entry, `order.paid` dispatch) is the
//! job of [`crate::OrderFlowApi`].
//!
//! | Trigger              | Payment status | New status | New payment status |
//! |----------------------|----------------|------------|--------------------|
//! | approved             | pending        | processing | paid               |
//! | pending / in_process | pending        | (no-op)    | (no-op)            |
//! | rejected / cancelled | pending        | cancelled  | failed             |
//! | expired              | pending        | cancelled  | expired            |
//! | any                  | paid           | (no-op)    | (no-op)            |
//! | any                  | failed/expired | (no-op)    | (no-op)            |
//! | unknown              | pending        | (no-op)    | (no-op)            |
//!
//! If an operator has already moved an unpaid order past `processing` (shipped, delivered or refunded), an approval
//! keeps that status and only marks the payment as paid.
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use settlement_common::GatewayStatus;

use crate::db_types::{Order, OrderStatusType, PaymentStatusType};

/// Something that may move an order's payment state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentTrigger {
    /// A status reported by the payment gateway, either pulled during reconciliation or pushed by a notifier.
    Gateway(GatewayStatus),
    /// The order was left unpaid past the configured timeout.
    Expired,
}

impl From<GatewayStatus> for PaymentTrigger {
    fn from(status: GatewayStatus) -> Self {
        Self::Gateway(status)
    }
}

impl Display for PaymentTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gateway(status) => write!(f, "{status}"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTransition {
    pub from_status: OrderStatusType,
    pub from_payment_status: PaymentStatusType,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatusType,
    /// True if this transition is the one that marks the order as paid. Only these transitions dispatch `order.paid`.
    pub first_paid: bool,
}

impl Display for PaymentTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} -> {}/{}", self.from_status, self.from_payment_status, self.status, self.payment_status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoOpReason {
    /// The payment was already marked as paid. This is final.
    AlreadyPaid,
    /// The payment already failed or expired.
    AlreadyTerminal(PaymentStatusType),
    /// The gateway is still waiting on the customer or reviewing the payment.
    StillPending,
    /// The gateway reported a status we don't understand.
    UnknownStatus(String),
}

impl Display for NoOpReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyPaid => write!(f, "already_paid"),
            Self::AlreadyTerminal(_) => write!(f, "already_terminal"),
            Self::StillPending => write!(f, "still_pending"),
            Self::UnknownStatus(s) => write!(f, "unknown_status_{s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionAction {
    Apply(PaymentTransition),
    NoOp(NoOpReason),
}

/// Decides how `order` responds to `trigger`.
pub fn transition(order: &Order, trigger: &PaymentTrigger) -> TransitionAction {
    use PaymentStatusType as P;
    match order.payment_status {
        P::Paid => return TransitionAction::NoOp(NoOpReason::AlreadyPaid),
        P::Failed | P::Expired => return TransitionAction::NoOp(NoOpReason::AlreadyTerminal(order.payment_status)),
        P::Pending => {},
    }
    let (status, payment_status) = match trigger {
        PaymentTrigger::Gateway(GatewayStatus::Approved) => {
            let status =
                if order.status.is_post_payment() { order.status } else { OrderStatusType::Processing };
            (status, P::Paid)
        },
        PaymentTrigger::Gateway(GatewayStatus::Pending | GatewayStatus::InProcess) => {
            return TransitionAction::NoOp(NoOpReason::StillPending)
        },
        PaymentTrigger::Gateway(GatewayStatus::Rejected | GatewayStatus::Cancelled) => {
            (OrderStatusType::Cancelled, P::Failed)
        },
        PaymentTrigger::Gateway(GatewayStatus::Unknown(s)) => {
            return TransitionAction::NoOp(NoOpReason::UnknownStatus(s.clone()))
        },
        PaymentTrigger::Expired => (OrderStatusType::Cancelled, P::Expired),
    };
    TransitionAction::Apply(PaymentTransition {
        from_status: order.status,
        from_payment_status: order.payment_status,
        status,
        payment_status,
        first_paid: payment_status == P::Paid,
    })
}
