use std::fmt::Debug;

use crate::{
    db_types::{Order, StatusHistoryEntry},
    fees::{FeeCalculator, OrderFeeBreakdown, ResolvedCost},
    traits::{SettlementDatabase, SettlementError},
};

/// Read-only views over orders for the admin console: the order itself, its status history and its settlement math.
pub struct SettlementApi<B> {
    db: B,
    calculator: FeeCalculator,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi ({:?})", self.calculator.rates())
    }
}

impl<B> SettlementApi<B>
where B: SettlementDatabase
{
    pub fn new(db: B, calculator: FeeCalculator) -> Self {
        Self { db, calculator }
    }

    pub async fn order(&self, order_id: i64) -> Result<Order, SettlementError> {
        self.db.fetch_order(order_id).await?.ok_or_else(|| SettlementError::OrderNotFound(order_id.to_string()))
    }

    pub async fn history(&self, order_id: i64) -> Result<Vec<StatusHistoryEntry>, SettlementError> {
        let order = self.order(order_id).await?;
        self.db.fetch_status_history(order.id).await
    }

    /// The fee breakdown for the order. Items without a snapshot cost are costed at the product's current cost price,
    /// and the breakdown is flagged as an estimate.
    pub async fn fee_breakdown(&self, order_id: i64) -> Result<OrderFeeBreakdown, SettlementError> {
        let order = self.order(order_id).await?;
        let items = self.db.fetch_order_items(order.id).await?;
        let mut costed = Vec::with_capacity(items.len());
        for item in items {
            let snapshot_cost = item.snapshot.cost_price.filter(|c| !c.is_zero());
            let current_cost = match snapshot_cost {
                Some(_) => None,
                None => self.db.fetch_product_cost(item.product_id).await?,
            };
            let cost = ResolvedCost::resolve(snapshot_cost, current_cost);
            costed.push((item, cost));
        }
        Ok(self.calculator.order_breakdown(&order, &costed))
    }
}
