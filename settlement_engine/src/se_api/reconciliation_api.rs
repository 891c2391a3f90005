use std::fmt::Debug;

use log::*;
use settlement_common::{GatewayStatus, PaymentStatusReport};

use crate::{
    db_types::{HistorySource, Order},
    order_state::PaymentTrigger,
    se_api::{
        order_flow_api::{OrderFlowApi, PaymentDetails, TransitionOutcome},
        reconciliation_objects::{ReconciliationConfig, ReconciliationDetail, ReconciliationOutcome, ReconciliationReport},
    },
    traits::{GatewayError, PaymentStatusProvider, SettlementDatabase, SettlementError},
};

/// Pulls payment status from the gateway for orders that are still waiting on payment.
///
/// Each run checks a bounded batch of orders, oldest first. A gateway or database failure on one order is recorded in
/// the report and the run moves on to the next order. Orders that could not be resolved are picked up again on the
/// next run.
pub struct ReconciliationApi<B, G> {
    flow: OrderFlowApi<B>,
    gateway: G,
    config: ReconciliationConfig,
}

impl<B, G> Debug for ReconciliationApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi ({:?})", self.config)
    }
}

impl<B, G> ReconciliationApi<B, G> {
    pub fn new(flow: OrderFlowApi<B>, gateway: G, config: ReconciliationConfig) -> Self {
        Self { flow, gateway, config }
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }
}

impl<B, G> ReconciliationApi<B, G>
where
    B: SettlementDatabase,
    G: PaymentStatusProvider,
{
    /// Runs one reconciliation batch. Only a failure to select the batch is returned as an error.
    pub async fn run_once(&self) -> Result<ReconciliationReport, SettlementError> {
        let orders = self.flow.db().fetch_reconcilable_orders(self.config.batch_size).await?;
        debug!("🔄️ Reconciling {} orders against the payment gateway", orders.len());
        let mut report = ReconciliationReport::default();
        for order in orders {
            let detail = self.reconcile_order(&order).await;
            if detail.outcome.is_error() {
                warn!(
                    "🔄️ Could not reconcile order {}. {}",
                    order.order_number,
                    detail.message.as_deref().unwrap_or_default()
                );
            }
            report.record(detail);
        }
        info!("🔄️ Reconciliation run complete: {report}");
        Ok(report)
    }

    async fn reconcile_order(&self, order: &Order) -> ReconciliationDetail {
        let payment_id = order.payment_id.clone().unwrap_or_default();
        let mut detail = ReconciliationDetail {
            order_id: order.id,
            order_number: order.order_number.clone(),
            payment_id: payment_id.clone(),
            outcome: ReconciliationOutcome::GatewayError,
            status: None,
            payment_status: None,
            message: None,
        };
        let report = match self.fetch_status(&payment_id).await {
            Ok(r) => r,
            Err(e) => {
                detail.message = Some(e.to_string());
                return detail;
            },
        };
        if let Some(amount) = report.amount {
            if report.status == GatewayStatus::Approved
                && amount.rounded() != order.total_amount.rounded()
            {
                warn!(
                    "🔄️ Gateway approved {amount} for order {}, but the order total is {}",
                    order.order_number, order.total_amount
                );
            }
        }
        let note = match report.amount {
            Some(amount) => format!("Gateway reported {} ({amount})", report.status),
            None => format!("Gateway reported {}", report.status),
        };
        let details = PaymentDetails { note, ..Default::default() };
        let trigger = PaymentTrigger::Gateway(report.status);
        match self.flow.apply_payment_status(order, &trigger, HistorySource::Gateway, details).await {
            Ok(TransitionOutcome::Applied { order, .. }) => {
                detail.outcome = ReconciliationOutcome::Updated;
                detail.status = Some(order.status);
                detail.payment_status = Some(order.payment_status);
            },
            Ok(TransitionOutcome::NoOp(reason)) => {
                detail.outcome = ReconciliationOutcome::Unchanged(reason.to_string());
            },
            Ok(TransitionOutcome::Superseded) => {
                detail.outcome = ReconciliationOutcome::Superseded;
            },
            Err(e) => {
                detail.outcome = ReconciliationOutcome::PersistenceError;
                detail.message = Some(e.to_string());
            },
        }
        detail
    }

    async fn fetch_status(&self, payment_id: &str) -> Result<PaymentStatusReport, GatewayError> {
        if payment_id.trim().is_empty() {
            return Err(GatewayError::UnknownReference("(empty)".into()));
        }
        let call = self.gateway.fetch_status(payment_id);
        match tokio::time::timeout(self.config.gateway_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(format!(
                "No answer for payment {payment_id} after {}ms",
                self.config.gateway_timeout.as_millis()
            ))),
        }
    }
}
