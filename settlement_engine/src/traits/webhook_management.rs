use crate::{
    db_types::WebhookSubscription,
    traits::{
        data_objects::{DeliveryRecord, SubscriptionUpdate},
        SettlementError,
    },
};

/// Storage for webhook subscriptions. There is at most one subscription per event type.
#[allow(async_fn_in_trait)]
pub trait WebhookManagement: Clone {
    async fn fetch_subscription(&self, event_type: &str) -> Result<Option<WebhookSubscription>, SettlementError>;

    async fn fetch_subscriptions(&self) -> Result<Vec<WebhookSubscription>, SettlementError>;

    /// Updates the subscription for `update.event_type`, creating it with `new_secret` if it doesn't exist yet.
    /// `new_secret` is ignored for existing subscriptions.
    async fn upsert_subscription(
        &self,
        update: SubscriptionUpdate,
        new_secret: &str,
    ) -> Result<WebhookSubscription, SettlementError>;

    /// Replaces the shared secret. Returns `None` if there is no subscription for the event type.
    async fn rotate_secret(
        &self,
        event_type: &str,
        new_secret: &str,
    ) -> Result<Option<WebhookSubscription>, SettlementError>;

    /// Overwrites the delivery bookkeeping fields with the outcome of the latest attempt.
    async fn record_delivery(&self, event_type: &str, record: DeliveryRecord) -> Result<(), SettlementError>;
}
