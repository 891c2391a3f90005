use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order},
    traits::{PaymentUpdate, SettlementError, StatusUpdate},
};

/// Inserts a new order row. This does not store the items or the initial history entry. Wrap the calls in a
/// transaction and pass `&mut *tx` if you need them to land together.
pub async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<Order, SettlementError> {
    let total = order.total_amount();
    let order: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                order_number,
                user_id,
                customer_name,
                customer_email,
                customer_phone,
                reseller_id,
                payment_id,
                external_reference,
                payment_method,
                total_amount,
                shipping_amount,
                tax_amount,
                shipping_label_path,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
            RETURNING *;
        "#,
    )
    .bind(&order.order_number)
    .bind(&order.user_id)
    .bind(&order.customer_name)
    .bind(&order.customer_email)
    .bind(&order.customer_phone)
    .bind(order.reseller_id)
    .bind(&order.payment_id)
    .bind(&order.external_reference)
    .bind(&order.payment_method)
    .bind(total.to_storage_string())
    .bind(order.shipping_amount.to_storage_string())
    .bind(order.tax_amount.to_storage_string())
    .bind(&order.shipping_label_path)
    .bind(order.created_at)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order [{}] inserted with id {}", order.order_number, order.id);
    Ok(order)
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await
}

pub async fn fetch_order_by_number(order_number: &str, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE order_number = $1").bind(order_number).fetch_optional(conn).await
}

/// If more than one order carries the payment id, the most recent one wins.
pub async fn fetch_order_by_payment_id(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE payment_id = $1 ORDER BY id DESC LIMIT 1")
        .bind(payment_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_order_by_external_reference(
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE external_reference = $1 ORDER BY id DESC LIMIT 1")
        .bind(reference)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_reconcilable_orders(limit: u32, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders: Vec<Order> = sqlx::query_as(
        r#"
        SELECT * FROM orders
        WHERE status = 'pending' AND payment_status = 'pending' AND payment_id IS NOT NULL AND payment_id != ''
        ORDER BY julianday(created_at) ASC, id ASC
        LIMIT $1"#,
    )
    .bind(i64::from(limit))
    .fetch_all(conn)
    .await?;
    trace!("🗃️ {} orders are waiting on the payment gateway", orders.len());
    Ok(orders)
}

pub async fn fetch_unpaid_orders_created_before(
    cutoff: DateTime<Utc>,
    limit: u32,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as(
        r#"
        SELECT * FROM orders
        WHERE status = 'pending' AND payment_status = 'pending' AND julianday(created_at) < julianday($1)
        ORDER BY julianday(created_at) ASC, id ASC
        LIMIT $2"#,
    )
    .bind(cutoff)
    .bind(i64::from(limit))
    .fetch_all(conn)
    .await
}

/// Conditionally applies a payment transition. The row is only updated if its status and payment status still match
/// the expected values. Returns `None` otherwise.
///
/// The payment id is only filled in if the order doesn't have one yet. The payment method is overwritten when given.
pub(crate) async fn compare_and_set_payment(
    update: &PaymentUpdate,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order: Option<Order> = sqlx::query_as(
        r#"
        UPDATE orders SET
            status = $1,
            payment_status = $2,
            payment_method = COALESCE($3, payment_method),
            payment_id = COALESCE(NULLIF(payment_id, ''), $4),
            updated_at = $5
        WHERE id = $6 AND status = $7 AND payment_status = $8
        RETURNING *"#,
    )
    .bind(update.status)
    .bind(update.payment_status)
    .bind(&update.payment_method)
    .bind(&update.payment_id)
    .bind(now)
    .bind(update.order_id)
    .bind(update.expected_status)
    .bind(update.expected_payment_status)
    .fetch_optional(conn)
    .await?;
    trace!("🗃️ Payment update for order {} matched: {}", update.order_id, order.is_some());
    Ok(order)
}

/// Conditionally sets the order status. The payment status is left alone.
pub(crate) async fn compare_and_set_status(
    update: &StatusUpdate,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4 RETURNING *")
        .bind(update.status)
        .bind(now)
        .bind(update.order_id)
        .bind(update.expected_status)
        .fetch_optional(conn)
        .await
}
