use std::fmt::Debug;

use log::*;

use crate::{
    db_types::WebhookSubscriptionSummary,
    helpers::generate_secret,
    se_api::webhook_payloads::WebhookEventType,
    traits::{SettlementError, SubscriptionUpdate, WebhookManagement},
};

/// Operator-facing management of webhook subscriptions.
pub struct WebhookApi<B> {
    db: B,
}

impl<B> Debug for WebhookApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WebhookApi")
    }
}

impl<B> WebhookApi<B>
where B: WebhookManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    /// All subscriptions, with their secrets masked.
    pub async fn subscriptions(&self) -> Result<Vec<WebhookSubscriptionSummary>, SettlementError> {
        let subs = self.db.fetch_subscriptions().await?;
        Ok(subs.iter().map(|s| s.summary()).collect())
    }

    /// Sets the URL and/or active flag for an event type. The subscription is created, inactive and with a fresh
    /// secret, if it doesn't exist yet.
    ///
    /// An empty URL clears the stored one. A subscription cannot be active without a URL.
    pub async fn configure(&self, update: SubscriptionUpdate) -> Result<WebhookSubscriptionSummary, SettlementError> {
        let event_type = parse_event_type(&update.event_type)?;
        if let Some(url) = update.webhook_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            validate_url(url)?;
        }
        let existing = self.db.fetch_subscription(&update.event_type).await?;
        let will_have_url = match update.webhook_url.as_deref() {
            Some(url) => !url.trim().is_empty(),
            None => existing.as_ref().and_then(|s| s.webhook_url.as_deref()).map(|u| !u.trim().is_empty()).unwrap_or(false),
        };
        let will_be_active = update.active.or_else(|| existing.as_ref().map(|s| s.active)).unwrap_or(false);
        if will_be_active && !will_have_url {
            return Err(SettlementError::ValidationError(format!(
                "The {event_type} subscription cannot be active without a webhook URL"
            )));
        }
        let subscription = self.db.upsert_subscription(update, &generate_secret()).await?;
        info!(
            "🪝️ Webhook subscription for {event_type} updated. Active: {}. URL: {}",
            subscription.active,
            subscription.webhook_url.as_deref().unwrap_or("(none)")
        );
        Ok(subscription.summary())
    }

    /// Replaces the shared secret for an event type. The new secret is returned. This is the only time it is
    /// revealed, so the operator must pass it on to the integrator.
    pub async fn rotate_secret(&self, event_type: &str) -> Result<String, SettlementError> {
        parse_event_type(event_type)?;
        let secret = generate_secret();
        match self.db.rotate_secret(event_type, &secret).await? {
            Some(_) => {
                info!("🪝️ Secret for the {event_type} webhook has been rotated");
                Ok(secret)
            },
            None => Err(SettlementError::SubscriptionNotFound(event_type.to_string())),
        }
    }
}

fn parse_event_type(event_type: &str) -> Result<WebhookEventType, SettlementError> {
    event_type.parse::<WebhookEventType>().map_err(SettlementError::ValidationError)
}

fn validate_url(url: &str) -> Result<(), SettlementError> {
    let scheme_ok = url.starts_with("https://") || url.starts_with("http://");
    let has_host = url.split_once("://").map(|(_, rest)| !rest.is_empty() && !rest.starts_with('/')).unwrap_or(false);
    if scheme_ok && has_host && !url.contains(char::is_whitespace) {
        Ok(())
    } else {
        Err(SettlementError::ValidationError(format!("{url} is not a valid http(s) URL")))
    }
}
