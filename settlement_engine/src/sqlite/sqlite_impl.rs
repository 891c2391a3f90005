//! `SqliteDatabase` is the SQLite implementation of the settlement engine backend.
//!
//! It implements all of the storage traits in [`crate::traits`].
use std::fmt::Debug;

use chrono::{DateTime, Utc};
use log::*;
use settlement_common::Money;
use sqlx::{migrate, SqlitePool};

use super::db::{customers, db_url, new_pool, order_items, orders, products, status_history, webhooks};
use crate::{
    db_types::{CustomerProfile, HistorySource, NewOrder, Order, OrderItem, Reseller, StatusHistoryEntry, WebhookSubscription},
    traits::{
        CustomerDirectory,
        DeliveryRecord,
        PaymentUpdate,
        SettlementDatabase,
        SettlementError,
        StatusUpdate,
        SubscriptionUpdate,
        WebhookManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SettlementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_order(&self, id: i64) -> Result<Option<Order>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order(id, &mut conn).await?)
    }

    async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_number(order_number, &mut conn).await?)
    }

    async fn fetch_order_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_payment_id(payment_id, &mut conn).await?)
    }

    async fn fetch_order_by_external_reference(&self, reference: &str) -> Result<Option<Order>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_order_by_external_reference(reference, &mut conn).await?)
    }

    async fn fetch_reconcilable_orders(&self, limit: u32) -> Result<Vec<Order>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_reconcilable_orders(limit, &mut conn).await?)
    }

    async fn fetch_unpaid_orders_created_before(
        &self,
        cutoff: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Order>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(orders::fetch_unpaid_orders_created_before(cutoff, limit, &mut conn).await?)
    }

    /// In a single atomic transaction,
    /// * conditionally updates the order row, if it is still in the expected state,
    /// * appends the history entry for the new state.
    ///
    /// If the row no longer matches, the transaction is rolled back and `None` is returned.
    async fn apply_payment_update(&self, update: PaymentUpdate) -> Result<Option<Order>, SettlementError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        // The conditional update must be the first statement, so that the write lock is taken up front
        let Some(order) = orders::compare_and_set_payment(&update, now, &mut tx).await? else {
            debug!("🗃️ Order {} has moved on. Payment update skipped.", update.order_id);
            tx.rollback().await?;
            return Ok(None);
        };
        status_history::append_entry(&order, update.source, &update.note, now, &mut tx).await?;
        tx.commit().await?;
        debug!(
            "🗃️ Order {} is now {}/{} ({})",
            order.order_number, order.status, order.payment_status, update.source
        );
        Ok(Some(order))
    }

    async fn apply_status_update(&self, update: StatusUpdate) -> Result<Option<Order>, SettlementError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::compare_and_set_status(&update, now, &mut tx).await? else {
            tx.rollback().await?;
            return Ok(None);
        };
        status_history::append_entry(&order, HistorySource::Admin, &update.note, now, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} status set to {} by an operator", order.order_number, order.status);
        Ok(Some(order))
    }

    async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        order_items::fetch_items_for_order(order_id, &mut conn).await
    }

    async fn fetch_status_history(&self, order_id: i64) -> Result<Vec<StatusHistoryEntry>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(status_history::fetch_history(order_id, &mut conn).await?)
    }

    async fn fetch_product_cost(&self, product_id: i64) -> Result<Option<Money>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_cost_price(product_id, &mut conn).await
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, SettlementError> {
        if order.order_number.trim().is_empty() {
            return Err(SettlementError::ValidationError("Order number cannot be empty".into()));
        }
        let mut tx = self.pool.begin().await?;
        let inserted = orders::insert_order(&order, &mut tx).await?;
        for item in &order.items {
            order_items::insert_item(inserted.id, item, &mut tx).await?;
        }
        tx.commit().await?;
        Ok(inserted)
    }
}

impl WebhookManagement for SqliteDatabase {
    async fn fetch_subscription(&self, event_type: &str) -> Result<Option<WebhookSubscription>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(webhooks::fetch_subscription(event_type, &mut conn).await?)
    }

    async fn fetch_subscriptions(&self) -> Result<Vec<WebhookSubscription>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(webhooks::fetch_subscriptions(&mut conn).await?)
    }

    async fn upsert_subscription(
        &self,
        update: SubscriptionUpdate,
        new_secret: &str,
    ) -> Result<WebhookSubscription, SettlementError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        webhooks::insert_if_missing(&update.event_type, new_secret, now, &mut tx).await?;
        let subscription = webhooks::update_subscription(&update, now, &mut tx)
            .await?
            .ok_or_else(|| SettlementError::SubscriptionNotFound(update.event_type.clone()))?;
        tx.commit().await?;
        Ok(subscription)
    }

    async fn rotate_secret(
        &self,
        event_type: &str,
        new_secret: &str,
    ) -> Result<Option<WebhookSubscription>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(webhooks::set_secret(event_type, new_secret, Utc::now(), &mut conn).await?)
    }

    async fn record_delivery(&self, event_type: &str, record: DeliveryRecord) -> Result<(), SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let updated = webhooks::record_delivery(event_type, &record, &mut conn).await?;
        if updated == 0 {
            return Err(SettlementError::SubscriptionNotFound(event_type.to_string()));
        }
        Ok(())
    }
}

impl CustomerDirectory for SqliteDatabase {
    async fn fetch_customer_profile(&self, user_id: &str) -> Result<Option<CustomerProfile>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(customers::fetch_profile(user_id, &mut conn).await?)
    }

    async fn fetch_reseller(&self, reseller_id: i64) -> Result<Option<Reseller>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        Ok(customers::fetch_reseller(reseller_id, &mut conn).await?)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object, using the URL in `SPG_DATABASE_URL`.
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("🗃️ Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Brings the schema up to date. Safe to call on every start-up.
    pub async fn run_migrations(&self) -> Result<(), SettlementError> {
        migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| SettlementError::DatabaseError(format!("Could not run migrations. {e}")))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
