use sqlx::SqliteConnection;

use crate::db_types::{CustomerProfile, Reseller};

pub async fn fetch_profile(user_id: &str, conn: &mut SqliteConnection) -> Result<Option<CustomerProfile>, sqlx::Error> {
    sqlx::query_as("SELECT user_id, full_name, email, phone, created_at FROM profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await
}

pub async fn fetch_reseller(id: i64, conn: &mut SqliteConnection) -> Result<Option<Reseller>, sqlx::Error> {
    sqlx::query_as("SELECT id, name, slug FROM resellers WHERE id = $1").bind(id).fetch_optional(conn).await
}
