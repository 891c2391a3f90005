use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{HistorySource, Order, StatusHistoryEntry};

/// Appends a history entry recording the order's current status and payment status.
pub async fn append_entry(
    order: &Order,
    source: HistorySource,
    note: &str,
    at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<StatusHistoryEntry, sqlx::Error> {
    let note = if note.trim().is_empty() { None } else { Some(note) };
    sqlx::query_as(
        r#"
        INSERT INTO order_status_history (order_id, status, payment_status, note, source, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *"#,
    )
    .bind(order.id)
    .bind(order.status)
    .bind(order.payment_status)
    .bind(note)
    .bind(source)
    .bind(at)
    .fetch_one(conn)
    .await
}

pub async fn fetch_history(order_id: i64, conn: &mut SqliteConnection) -> Result<Vec<StatusHistoryEntry>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_status_history WHERE order_id = $1 ORDER BY id ASC")
        .bind(order_id)
        .fetch_all(conn)
        .await
}
