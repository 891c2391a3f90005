//! Fee breakdown calculator.
//!
//! Decomposes a sale price into the gateway transaction fee, a contingency reserve, the cost of goods and the
//! resulting profit. Everything here is pure.
//!
//! All arithmetic is carried out at full decimal precision. Values are rounded to cents (half-up) only when a
//! breakdown is produced, so that rounding errors never compound from one step to the next. For example, a sale of
//! `100.00` against a cost of `60.00` has a contingency fee of `0.955` and a profit of `34.545`, which are reported as
//! `0.96` and `34.55` respectively.
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use settlement_common::{Money, CURRENCY_DECIMALS};

use crate::db_types::{Order, OrderItem};

/// The rates applied by the calculator. Rates are fractions, i.e. `0.045` is 4.5%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeRates {
    pub transaction_rate: Decimal,
    pub contingency_rate: Decimal,
}

impl Default for FeeRates {
    fn default() -> Self {
        Self { transaction_rate: Decimal::new(45, 3), contingency_rate: Decimal::new(1, 2) }
    }
}

impl FeeRates {
    pub fn new(transaction_rate: Decimal, contingency_rate: Decimal) -> Self {
        Self { transaction_rate, contingency_rate }
    }
}

/// Where an item's cost price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedCost {
    pub unit_cost: Money,
    /// True when the order item snapshot had no cost and something else had to stand in for it.
    pub is_estimated: bool,
}

impl ResolvedCost {
    /// Prefer the cost captured in the product snapshot. If it is missing or zero, fall back to the product's current
    /// cost and flag the result as an estimate. With neither available, the cost is taken as zero (also an estimate).
    pub fn resolve(snapshot_cost: Option<Money>, current_cost: Option<Money>) -> Self {
        match snapshot_cost {
            Some(cost) if !cost.is_zero() => Self { unit_cost: cost, is_estimated: false },
            _ => Self { unit_cost: current_cost.unwrap_or_default(), is_estimated: true },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    pub sale_price: Money,
    pub transaction_fee: Money,
    pub after_transaction: Money,
    pub contingency_fee: Money,
    pub after_contingency: Money,
    pub cost_price: Money,
    pub profit: Money,
    /// Profit as a percentage of the sale price.
    pub profit_margin: Decimal,
    pub is_estimated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFeeBreakdown {
    pub item_id: i64,
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
    #[serde(flatten)]
    pub breakdown: FeeBreakdown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderFeeBreakdown {
    pub order_id: i64,
    pub order_number: String,
    pub subtotal: Money,
    pub shipping_amount: Money,
    pub tax_amount: Money,
    pub total_revenue: Money,
    pub transaction_fee: Money,
    pub after_transaction: Money,
    pub contingency_fee: Money,
    pub after_contingency: Money,
    pub total_cost: Money,
    pub net_profit: Money,
    /// Net profit as a percentage of total revenue (subtotal + shipping + tax).
    pub profit_margin: Decimal,
    pub is_estimated: bool,
    pub items: Vec<ItemFeeBreakdown>,
}

/// Unrounded intermediate values.
struct Fees {
    transaction_fee: Money,
    after_transaction: Money,
    contingency_fee: Money,
    after_contingency: Money,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FeeCalculator {
    rates: FeeRates,
}

impl FeeCalculator {
    pub fn new(rates: FeeRates) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &FeeRates {
        &self.rates
    }

    fn fees(&self, sale_price: Money) -> Fees {
        let transaction_fee = sale_price * self.rates.transaction_rate;
        let after_transaction = sale_price - transaction_fee;
        let contingency_fee = after_transaction * self.rates.contingency_rate;
        let after_contingency = after_transaction - contingency_fee;
        Fees { transaction_fee, after_transaction, contingency_fee, after_contingency }
    }

    /// Breaks a single sale down into fees and profit.
    pub fn breakdown(&self, sale_price: Money, cost_price: Money, is_cost_estimated: bool) -> FeeBreakdown {
        let fees = self.fees(sale_price);
        let profit = fees.after_contingency - cost_price;
        FeeBreakdown {
            sale_price: sale_price.rounded(),
            transaction_fee: fees.transaction_fee.rounded(),
            after_transaction: fees.after_transaction.rounded(),
            contingency_fee: fees.contingency_fee.rounded(),
            after_contingency: fees.after_contingency.rounded(),
            cost_price: cost_price.rounded(),
            profit: profit.rounded(),
            profit_margin: percentage(profit, sale_price),
            is_estimated: is_cost_estimated,
        }
    }

    /// Breaks a whole order down.
    ///
    /// Gateway fees are charged once per transaction, so they are computed on the item subtotal rather than summed
    /// over the items. Each item in `items` is paired with its resolved unit cost. The per-item breakdowns treat every
    /// line as its own sale and are informational only.
    pub fn order_breakdown(&self, order: &Order, items: &[(OrderItem, ResolvedCost)]) -> OrderFeeBreakdown {
        let subtotal = items.iter().map(|(item, _)| item.total_price).sum::<Money>();
        let total_cost = items.iter().map(|(item, cost)| cost.unit_cost * item.quantity).sum::<Money>();
        let is_estimated = items.iter().any(|(_, cost)| cost.is_estimated);
        let total_revenue = subtotal + order.shipping_amount + order.tax_amount;
        let fees = self.fees(subtotal);
        let net_profit = fees.after_contingency - total_cost;
        let item_breakdowns = items
            .iter()
            .map(|(item, cost)| ItemFeeBreakdown {
                item_id: item.id,
                product_id: item.product_id,
                product_name: item.snapshot.name.clone(),
                quantity: item.quantity,
                breakdown: self.breakdown(item.total_price, cost.unit_cost * item.quantity, cost.is_estimated),
            })
            .collect();
        OrderFeeBreakdown {
            order_id: order.id,
            order_number: order.order_number.clone(),
            subtotal: subtotal.rounded(),
            shipping_amount: order.shipping_amount.rounded(),
            tax_amount: order.tax_amount.rounded(),
            total_revenue: total_revenue.rounded(),
            transaction_fee: fees.transaction_fee.rounded(),
            after_transaction: fees.after_transaction.rounded(),
            contingency_fee: fees.contingency_fee.rounded(),
            after_contingency: fees.after_contingency.rounded(),
            total_cost: total_cost.rounded(),
            net_profit: net_profit.rounded(),
            profit_margin: percentage(net_profit, total_revenue),
            is_estimated,
            items: item_breakdowns,
        }
    }
}

/// `part / whole * 100`, rounded half-up to two places. Zero when `whole` is zero.
fn percentage(part: Money, whole: Money) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO.round_dp(CURRENCY_DECIMALS);
    }
    let mut pct = (part.value() / whole.value() * Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(CURRENCY_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
    pct.rescale(CURRENCY_DECIMALS);
    pct
}
