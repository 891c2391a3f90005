use settlement_common::Money;
use sqlx::{FromRow, SqliteConnection};

use crate::{
    db_types::{NewOrderItem, OrderItem, ProductSnapshot},
    traits::SettlementError,
};

#[derive(Debug, Clone, FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: i64,
    quantity: i64,
    #[sqlx(try_from = "String")]
    unit_price: Money,
    #[sqlx(try_from = "String")]
    total_price: Money,
    product_name: String,
    product_sku: Option<String>,
    cost_price: Option<String>,
    image_url: Option<String>,
}

impl TryFrom<OrderItemRow> for OrderItem {
    type Error = SettlementError;

    fn try_from(row: OrderItemRow) -> Result<Self, Self::Error> {
        let cost_price = row
            .cost_price
            .filter(|c| !c.trim().is_empty())
            .map(|c| c.parse::<Money>())
            .transpose()
            .map_err(|e| SettlementError::DatabaseError(format!("Order item {} has a bad cost price. {e}", row.id)))?;
        Ok(OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price: row.unit_price,
            total_price: row.total_price,
            snapshot: ProductSnapshot {
                name: row.product_name,
                sku: row.product_sku,
                cost_price,
                image_url: row.image_url,
            },
        })
    }
}

pub async fn insert_item(
    order_id: i64,
    item: &NewOrderItem,
    conn: &mut SqliteConnection,
) -> Result<OrderItem, SettlementError> {
    if item.quantity <= 0 {
        return Err(SettlementError::ValidationError(format!(
            "Quantity for product {} must be positive, not {}",
            item.product_id, item.quantity
        )));
    }
    let row: OrderItemRow = sqlx::query_as(
        r#"
            INSERT INTO order_items (
                order_id,
                product_id,
                quantity,
                unit_price,
                total_price,
                product_name,
                product_sku,
                cost_price,
                image_url
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price.to_storage_string())
    .bind(item.total_price().to_storage_string())
    .bind(&item.snapshot.name)
    .bind(&item.snapshot.sku)
    .bind(item.snapshot.cost_price.map(|c| c.to_storage_string()))
    .bind(&item.snapshot.image_url)
    .fetch_one(conn)
    .await?;
    OrderItem::try_from(row)
}

pub async fn fetch_items_for_order(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, SettlementError> {
    let rows: Vec<OrderItemRow> = sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    rows.into_iter().map(OrderItem::try_from).collect()
}
