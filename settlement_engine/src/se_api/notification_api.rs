use std::{fmt::Debug, sync::Arc};

use chrono::{DateTime, SecondsFormat, Utc};
use log::*;

use crate::{
    db_types::{CustomerProfile, Order, PaymentStatusType},
    helpers::calculate_hmac,
    se_api::{
        errors::NotificationError,
        webhook_payloads::{OrderPaidPayload, UserCreatedPayload, UserInactivePayload, WebhookPayload},
    },
    traits::{DeliveryRecord, LabelUrlSigner, NotificationBackend, SettlementError, WebhookRequest, WebhookTransport},
};

/// The longest response body excerpt kept in `last_error_message`
const ERROR_EXCERPT_LEN: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// No active subscription with a URL. Nothing was sent.
    Skipped,
    Delivered { status: u16 },
    /// The subscriber answered with a non-2xx status, or could not be reached (`status` is `None`).
    Failed { status: Option<u16>, error: String },
}

/// Signs and delivers webhook notifications to integrators.
///
/// A single delivery attempt is made per dispatch. The outcome of the attempt is recorded on the subscription, which
/// is where operators look to find failed deliveries and re-trigger them.
#[derive(Clone)]
pub struct NotificationApi<B, T> {
    db: B,
    transport: T,
    labels: Option<Arc<dyn LabelUrlSigner + Send + Sync>>,
}

impl<B, T> Debug for NotificationApi<B, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NotificationApi (label signing: {})", self.labels.is_some())
    }
}

impl<B, T> NotificationApi<B, T> {
    pub fn new(db: B, transport: T) -> Self {
        Self { db, transport, labels: None }
    }

    /// Shipping labels are only included in `order.paid` payloads if a signer is configured.
    pub fn with_label_signer(mut self, signer: Arc<dyn LabelUrlSigner + Send + Sync>) -> Self {
        self.labels = Some(signer);
        self
    }
}

impl<B, T> NotificationApi<B, T>
where
    B: NotificationBackend,
    T: WebhookTransport,
{
    /// Signs and delivers `payload` to the subscriber for its event type, if there is one.
    ///
    /// Delivery failures are not errors. They are recorded on the subscription and reported in the outcome. Only
    /// storage and serialization problems are returned as errors.
    pub async fn dispatch(&self, payload: &WebhookPayload) -> Result<DispatchOutcome, NotificationError> {
        let event_type = payload.event_type().to_string();
        let Some(subscription) = self.db.fetch_subscription(&event_type).await? else {
            debug!("📮️ No subscription for {event_type}. Nothing to send.");
            return Ok(DispatchOutcome::Skipped);
        };
        let Some(url) = subscription.delivery_url() else {
            debug!("📮️ The {event_type} subscription is inactive or has no URL. Nothing to send.");
            return Ok(DispatchOutcome::Skipped);
        };
        let body = payload.to_body()?;
        let now = Utc::now();
        let request = WebhookRequest {
            url: url.to_string(),
            event_type: event_type.clone(),
            signature: calculate_hmac(subscription.secret_token.reveal(), body.as_bytes()),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            body,
        };
        trace!("📮️ Sending {event_type} to {url}");
        let (record, outcome) = match self.transport.deliver(&request).await {
            Ok(response) if response.is_success() => {
                info!("📮️ {event_type} delivered to {url} ({})", response.status);
                (delivery_record(now, i64::from(response.status), None), DispatchOutcome::Delivered {
                    status: response.status,
                })
            },
            Ok(response) => {
                let error = format!("HTTP {}: {}", response.status, excerpt(&response.body));
                warn!("📮️ {event_type} delivery to {url} was rejected. {error}");
                let record = delivery_record(now, i64::from(response.status), Some(error.clone()));
                (record, DispatchOutcome::Failed { status: Some(response.status), error })
            },
            Err(e) => {
                let error = e.to_string();
                warn!("📮️ {event_type} delivery to {url} failed. {error}");
                let record = delivery_record(now, DeliveryRecord::NETWORK_FAILURE, Some(error.clone()));
                (record, DispatchOutcome::Failed { status: None, error })
            },
        };
        self.db.record_delivery(&event_type, record).await?;
        Ok(outcome)
    }

    /// Builds and dispatches the `order.paid` notification for `order`.
    pub async fn notify_order_paid(&self, order: &Order) -> Result<DispatchOutcome, NotificationError> {
        if order.payment_status != PaymentStatusType::Paid {
            return Err(NotificationError::OrderNotPaid(order.order_number.clone()));
        }
        let payload = self.order_paid_payload(order).await?;
        self.dispatch(&WebhookPayload::from(payload)).await
    }

    /// Re-sends `order.paid` for an order that is already paid. Operators use this after fixing a subscriber.
    pub async fn resend_order_paid(&self, order_id: i64) -> Result<DispatchOutcome, NotificationError> {
        let order = self
            .db
            .fetch_order(order_id)
            .await?
            .ok_or_else(|| SettlementError::OrderNotFound(order_id.to_string()))?;
        self.notify_order_paid(&order).await
    }

    pub async fn order_paid_payload(&self, order: &Order) -> Result<OrderPaidPayload, NotificationError> {
        let items = self.db.fetch_order_items(order.id).await?;
        let history = self.db.fetch_status_history(order.id).await?;
        let profile = match &order.user_id {
            Some(user_id) => self.db.fetch_customer_profile(user_id).await?,
            None => None,
        };
        let reseller = match order.reseller_id {
            Some(id) => self.db.fetch_reseller(id).await?,
            None => None,
        };
        let label = match (&self.labels, &order.shipping_label_path) {
            (Some(signer), Some(path)) if !path.trim().is_empty() => {
                let signed = signer.sign(path);
                if signed.is_none() {
                    warn!("📮️ Could not sign the shipping label for order {}", order.order_number);
                }
                signed
            },
            _ => None,
        };
        let payload = OrderPaidPayload::builder(order)
            .with_items(&items)
            .with_history(&history)
            .with_profile(profile)
            .with_reseller(reseller)
            .with_shipping_label(label)
            .build();
        Ok(payload)
    }

    pub async fn notify_user_created(&self, profile: &CustomerProfile) -> Result<DispatchOutcome, NotificationError> {
        self.dispatch(&WebhookPayload::from(UserCreatedPayload::from(profile))).await
    }

    pub async fn notify_user_inactive(
        &self,
        profile: &CustomerProfile,
        inactive_days: u32,
        last_seen_at: Option<DateTime<Utc>>,
    ) -> Result<DispatchOutcome, NotificationError> {
        if inactive_days == 0 {
            return Err(NotificationError::Validation("inactive_days must be at least 1".into()));
        }
        let mut payload = UserInactivePayload::new(profile, inactive_days);
        if let Some(at) = last_seen_at {
            payload = payload.with_last_seen(at);
        }
        self.dispatch(&WebhookPayload::from(payload)).await
    }

    /// Looks up the customer's profile and sends `user.created` for it.
    pub async fn notify_user_created_for(&self, user_id: &str) -> Result<DispatchOutcome, NotificationError> {
        let profile = self.customer_profile(user_id).await?;
        self.notify_user_created(&profile).await
    }

    /// Looks up the customer's profile and sends `user.inactive.<days>d` for it.
    pub async fn notify_user_inactive_for(
        &self,
        user_id: &str,
        inactive_days: u32,
        last_seen_at: Option<DateTime<Utc>>,
    ) -> Result<DispatchOutcome, NotificationError> {
        let profile = self.customer_profile(user_id).await?;
        self.notify_user_inactive(&profile, inactive_days, last_seen_at).await
    }

    async fn customer_profile(&self, user_id: &str) -> Result<CustomerProfile, NotificationError> {
        self.db
            .fetch_customer_profile(user_id)
            .await?
            .ok_or_else(|| NotificationError::CustomerNotFound(user_id.to_string()))
    }
}

fn delivery_record(at: DateTime<Utc>, status_code: i64, error_message: Option<String>) -> DeliveryRecord {
    DeliveryRecord { triggered_at: at, status_code, error_message }
}

fn excerpt(body: &str) -> &str {
    let body = body.trim();
    if body.len() <= ERROR_EXCERPT_LEN {
        return body;
    }
    let mut end = ERROR_EXCERPT_LEN;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}
