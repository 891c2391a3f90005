use chrono::{DateTime, Utc};
use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::WebhookSubscription,
    traits::{DeliveryRecord, SubscriptionUpdate},
};

pub async fn fetch_subscription(
    event_type: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<WebhookSubscription>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM webhook_subscriptions WHERE event_type = $1")
        .bind(event_type)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_subscriptions(conn: &mut SqliteConnection) -> Result<Vec<WebhookSubscription>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM webhook_subscriptions ORDER BY event_type ASC").fetch_all(conn).await
}

/// Creates an inactive subscription with no URL, unless one already exists for the event type.
pub async fn insert_if_missing(
    event_type: &str,
    secret: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO webhook_subscriptions (event_type, secret_token, created_at, updated_at)
        VALUES ($1, $2, $3, $3)
        ON CONFLICT (event_type) DO NOTHING"#,
    )
    .bind(event_type)
    .bind(secret)
    .bind(now)
    .execute(conn)
    .await?;
    if result.rows_affected() > 0 {
        debug!("🗃️ Created webhook subscription for {event_type}");
    }
    Ok(())
}

pub async fn update_subscription(
    update: &SubscriptionUpdate,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<WebhookSubscription>, sqlx::Error> {
    // An empty URL clears the stored one
    let clear_url = matches!(update.webhook_url.as_deref(), Some(u) if u.trim().is_empty());
    let url = update.webhook_url.as_deref().map(str::trim).filter(|u| !u.is_empty());
    sqlx::query_as(
        r#"
        UPDATE webhook_subscriptions SET
            webhook_url = CASE WHEN $1 THEN NULL ELSE COALESCE($2, webhook_url) END,
            active = COALESCE($3, active),
            updated_at = $4
        WHERE event_type = $5
        RETURNING *"#,
    )
    .bind(clear_url)
    .bind(url)
    .bind(update.active)
    .bind(now)
    .bind(&update.event_type)
    .fetch_optional(conn)
    .await
}

pub async fn set_secret(
    event_type: &str,
    secret: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<WebhookSubscription>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE webhook_subscriptions SET secret_token = $1, updated_at = $2 WHERE event_type = $3 RETURNING *",
    )
    .bind(secret)
    .bind(now)
    .bind(event_type)
    .fetch_optional(conn)
    .await
}

/// Overwrites the delivery bookkeeping. A successful delivery clears the last error.
pub async fn record_delivery(
    event_type: &str,
    record: &DeliveryRecord,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE webhook_subscriptions SET
            last_triggered_at = $1,
            last_status_code = $2,
            last_error_message = $3
        WHERE event_type = $4"#,
    )
    .bind(record.triggered_at)
    .bind(record.status_code)
    .bind(&record.error_message)
    .bind(event_type)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
