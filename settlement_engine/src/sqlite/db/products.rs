use settlement_common::Money;
use sqlx::SqliteConnection;

use crate::traits::SettlementError;

/// The current cost price of the product. `None` if the product is gone or never had a cost.
pub async fn fetch_cost_price(product_id: i64, conn: &mut SqliteConnection) -> Result<Option<Money>, SettlementError> {
    let cost: Option<Option<String>> = sqlx::query_scalar("SELECT cost_price FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    cost.flatten()
        .filter(|c| !c.trim().is_empty())
        .map(|c| c.parse::<Money>())
        .transpose()
        .map_err(|e| SettlementError::DatabaseError(format!("Product {product_id} has a bad cost price. {e}")))
}
