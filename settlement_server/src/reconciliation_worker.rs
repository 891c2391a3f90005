use std::time::Duration;

use log::*;
use settlement_engine::{db_types::Order, OrderFlowApi, ReconciliationApi, SqliteDatabase};
use tokio::task::JoinHandle;

use crate::integrations::GatewayStatusAdapter;

pub type ServerReconciliationApi = ReconciliationApi<SqliteDatabase, GatewayStatusAdapter>;

/// Starts the reconciliation worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// Every `interval`, the worker runs one reconciliation batch and then expires pending orders that have gone unpaid
/// for longer than `unpaid_expiry`. Passing `None` for `unpaid_expiry` disables expiry.
pub fn start_reconciliation_worker(
    api: ServerReconciliationApi,
    flow: OrderFlowApi<SqliteDatabase>,
    interval: Duration,
    unpaid_expiry: Option<chrono::Duration>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        // A batch that overruns the interval simply delays the next one
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let batch_size = api.config().batch_size;
        info!("🕰️ Reconciliation worker started. Running every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            debug!("🕰️ Running reconciliation job");
            match api.run_once().await {
                Ok(report) => info!("🕰️ Reconciliation: {report}"),
                Err(e) => error!("🕰️ Error running reconciliation job: {e}"),
            }
            let Some(expiry) = unpaid_expiry else {
                continue;
            };
            match flow.expire_unpaid_orders(expiry, batch_size).await {
                Ok(orders) if orders.is_empty() => trace!("🕰️ No unpaid orders to expire"),
                Ok(orders) => {
                    info!("🕰️ {} orders expired", orders.len());
                    debug!("🕰️ Expired unpaid orders: {}", order_list(&orders));
                },
                Err(e) => error!("🕰️ Error running unpaid order expiry job: {e}"),
            }
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("[{}] {} payment: {}", o.id, o.order_number, o.payment_id.as_deref().unwrap_or("none")))
        .collect::<Vec<String>>()
        .join(", ")
}
