//! # SQLite Database methods
//!
//! Low-level, per-table database functions.
//!
//! Every function takes a `&mut SqliteConnection` rather than a pool. Callers can pass a pooled connection, or
//! `&mut *tx` when several calls have to land in the same transaction.
use std::{env, str::FromStr};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod customers;
pub mod order_items;
pub mod orders;
pub mod products;
pub mod status_history;
pub mod webhooks;

const SQLITE_DB_URL: &str = "sqlite://data/settlement.db";

pub fn db_url() -> String {
    let result = env::var("SPG_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ SPG_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
