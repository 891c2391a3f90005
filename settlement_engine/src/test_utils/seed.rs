//! Inserts the collaborator rows (profiles, resellers, products) that the settlement engine only ever reads.
use chrono::{DateTime, Utc};
use settlement_common::Money;

use crate::{
    db_types::{CustomerProfile, Reseller},
    SqliteDatabase,
};

pub async fn insert_profile(db: &SqliteDatabase, profile: &CustomerProfile) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO profiles (user_id, full_name, email, phone, created_at) VALUES ($1, $2, $3, $4, $5)")
        .bind(&profile.user_id)
        .bind(&profile.full_name)
        .bind(&profile.email)
        .bind(&profile.phone)
        .bind(profile.created_at)
        .execute(db.pool())
        .await?;
    Ok(())
}

pub async fn insert_reseller(db: &SqliteDatabase, name: &str, slug: &str) -> Result<Reseller, sqlx::Error> {
    sqlx::query_as("INSERT INTO resellers (name, slug) VALUES ($1, $2) RETURNING id, name, slug")
        .bind(name)
        .bind(slug)
        .fetch_one(db.pool())
        .await
}

/// Returns the new product id.
pub async fn insert_product(
    db: &SqliteDatabase,
    name: &str,
    price: Money,
    cost_price: Option<Money>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("INSERT INTO products (name, price, cost_price) VALUES ($1, $2, $3) RETURNING id")
        .bind(name)
        .bind(price.to_storage_string())
        .bind(cost_price.map(|c| c.to_storage_string()))
        .fetch_one(db.pool())
        .await
}

pub fn profile(user_id: &str, name: &str, email: &str, created_at: DateTime<Utc>) -> CustomerProfile {
    CustomerProfile {
        user_id: user_id.to_string(),
        full_name: Some(name.to_string()),
        email: Some(email.to_string()),
        phone: None,
        created_at,
    }
}
