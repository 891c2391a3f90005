//! Outbound webhook payloads.
//!
//! Every event type has its own payload struct and builder, and [`WebhookPayload`] is the closed set of them. The
//! body that gets signed and sent is the JSON envelope `{"event_type": ..., "data": ...}`.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use settlement_common::Money;

use crate::{
    db_types::{CustomerProfile, Order, OrderItem, PaymentStatusType, Reseller, StatusHistoryEntry},
    traits::SignedLabelUrl,
};

pub const ORDER_PAID: &str = "order.paid";
pub const USER_CREATED: &str = "user.created";
const USER_INACTIVE_PREFIX: &str = "user.inactive.";

//--------------------------------------  WebhookEventType  ---------------------------------------------------------
/// The event types integrators can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebhookEventType {
    OrderPaid,
    UserCreated,
    /// A registered user has been inactive for the given number of days. Each threshold is its own subscription.
    UserInactive(u32),
}

impl Display for WebhookEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OrderPaid => write!(f, "{ORDER_PAID}"),
            Self::UserCreated => write!(f, "{USER_CREATED}"),
            Self::UserInactive(days) => write!(f, "{USER_INACTIVE_PREFIX}{days}d"),
        }
    }
}

impl FromStr for WebhookEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ORDER_PAID => Ok(Self::OrderPaid),
            USER_CREATED => Ok(Self::UserCreated),
            _ => s
                .strip_prefix(USER_INACTIVE_PREFIX)
                .and_then(|rest| rest.strip_suffix('d'))
                .filter(|days| !days.is_empty() && days.bytes().all(|b| b.is_ascii_digit()))
                .and_then(|days| days.parse::<u32>().ok())
                .filter(|days| *days > 0)
                .map(Self::UserInactive)
                .ok_or_else(|| format!("{s} is not a supported webhook event type")),
        }
    }
}

//--------------------------------------  order.paid  ---------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerSource {
    Registered,
    Guest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadCustomer {
    pub source: CustomerSource,
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl PayloadCustomer {
    /// Registered customers are described by their profile. Any field the profile lacks falls back to what was
    /// captured on the order. Guest customers are described by the order alone.
    pub fn resolve(order: &Order, profile: Option<&CustomerProfile>) -> Self {
        match (&order.user_id, profile) {
            (Some(user_id), Some(p)) => Self {
                source: CustomerSource::Registered,
                user_id: Some(user_id.clone()),
                name: p.full_name.clone().or_else(|| order.customer_name.clone()),
                email: p.email.clone().or_else(|| order.customer_email.clone()),
                phone: p.phone.clone().or_else(|| order.customer_phone.clone()),
            },
            (user_id, _) => Self {
                source: if user_id.is_some() { CustomerSource::Registered } else { CustomerSource::Guest },
                user_id: user_id.clone(),
                name: order.customer_name.clone(),
                email: order.customer_email.clone(),
                phone: order.customer_phone.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadReseller {
    pub id: i64,
    pub name: String,
    pub slug: Option<String>,
}

impl From<Reseller> for PayloadReseller {
    fn from(r: Reseller) -> Self {
        Self { id: r.id, name: r.name, slug: r.slug }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadItem {
    pub product_id: i64,
    pub name: String,
    pub sku: Option<String>,
    pub image_url: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
}

impl From<&OrderItem> for PayloadItem {
    fn from(item: &OrderItem) -> Self {
        Self {
            product_id: item.product_id,
            name: item.snapshot.name.clone(),
            sku: item.snapshot.sku.clone(),
            image_url: item.snapshot.image_url.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price.rounded(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidPayload {
    pub order_id: i64,
    pub order_number: String,
    pub total_amount: Money,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub customer: PayloadCustomer,
    pub reseller: Option<PayloadReseller>,
    pub items: Vec<PayloadItem>,
    pub shipping_label: Option<SignedLabelUrl>,
}

impl OrderPaidPayload {
    pub fn builder(order: &Order) -> OrderPaidPayloadBuilder {
        OrderPaidPayloadBuilder::new(order)
    }
}

pub struct OrderPaidPayloadBuilder {
    order: Order,
    profile: Option<CustomerProfile>,
    reseller: Option<Reseller>,
    items: Vec<PayloadItem>,
    shipping_label: Option<SignedLabelUrl>,
    paid_at: Option<DateTime<Utc>>,
}

impl OrderPaidPayloadBuilder {
    pub fn new(order: &Order) -> Self {
        Self {
            order: order.clone(),
            profile: None,
            reseller: None,
            items: Vec::new(),
            shipping_label: None,
            paid_at: None,
        }
    }

    /// Takes `paid_at` from the first history entry that recorded the order as paid. Without one, the order's
    /// `updated_at` is used.
    pub fn with_history(mut self, history: &[StatusHistoryEntry]) -> Self {
        self.paid_at = history
            .iter()
            .filter(|entry| entry.payment_status == PaymentStatusType::Paid)
            .map(|entry| entry.created_at)
            .min();
        self
    }

    pub fn with_profile(mut self, profile: Option<CustomerProfile>) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_reseller(mut self, reseller: Option<Reseller>) -> Self {
        self.reseller = reseller;
        self
    }

    pub fn with_items(mut self, items: &[OrderItem]) -> Self {
        self.items = items.iter().map(PayloadItem::from).collect();
        self
    }

    pub fn with_shipping_label(mut self, label: Option<SignedLabelUrl>) -> Self {
        self.shipping_label = label;
        self
    }

    pub fn build(self) -> OrderPaidPayload {
        let customer = PayloadCustomer::resolve(&self.order, self.profile.as_ref());
        OrderPaidPayload {
            order_id: self.order.id,
            order_number: self.order.order_number,
            total_amount: self.order.total_amount.rounded(),
            payment_method: self.order.payment_method,
            payment_id: self.order.payment_id,
            paid_at: self.paid_at.unwrap_or(self.order.updated_at),
            customer,
            reseller: self.reseller.map(PayloadReseller::from),
            items: self.items,
            shipping_label: self.shipping_label,
        }
    }
}

//--------------------------------------  user.*  -------------------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCreatedPayload {
    pub user_id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&CustomerProfile> for UserCreatedPayload {
    fn from(p: &CustomerProfile) -> Self {
        Self {
            user_id: p.user_id.clone(),
            full_name: p.full_name.clone(),
            email: p.email.clone(),
            phone: p.phone.clone(),
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInactivePayload {
    pub user_id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub inactive_days: u32,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl UserInactivePayload {
    pub fn new(profile: &CustomerProfile, inactive_days: u32) -> Self {
        Self {
            user_id: profile.user_id.clone(),
            full_name: profile.full_name.clone(),
            email: profile.email.clone(),
            inactive_days,
            last_seen_at: None,
        }
    }

    pub fn with_last_seen(mut self, at: DateTime<Utc>) -> Self {
        self.last_seen_at = Some(at);
        self
    }
}

//--------------------------------------  WebhookPayload  -----------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookPayload {
    OrderPaid(OrderPaidPayload),
    UserCreated(UserCreatedPayload),
    UserInactive(UserInactivePayload),
}

#[derive(Serialize)]
struct Envelope<'a, T: Serialize> {
    event_type: String,
    data: &'a T,
}

impl WebhookPayload {
    pub fn event_type(&self) -> WebhookEventType {
        match self {
            Self::OrderPaid(_) => WebhookEventType::OrderPaid,
            Self::UserCreated(_) => WebhookEventType::UserCreated,
            Self::UserInactive(p) => WebhookEventType::UserInactive(p.inactive_days),
        }
    }

    /// The JSON body that is signed and delivered.
    pub fn to_body(&self) -> Result<String, serde_json::Error> {
        let event_type = self.event_type().to_string();
        match self {
            Self::OrderPaid(data) => serde_json::to_string(&Envelope { event_type, data }),
            Self::UserCreated(data) => serde_json::to_string(&Envelope { event_type, data }),
            Self::UserInactive(data) => serde_json::to_string(&Envelope { event_type, data }),
        }
    }
}

impl From<OrderPaidPayload> for WebhookPayload {
    fn from(p: OrderPaidPayload) -> Self {
        Self::OrderPaid(p)
    }
}

impl From<UserCreatedPayload> for WebhookPayload {
    fn from(p: UserCreatedPayload) -> Self {
        Self::UserCreated(p)
    }
}

impl From<UserInactivePayload> for WebhookPayload {
    fn from(p: UserInactivePayload) -> Self {
        Self::UserInactive(p)
    }
}
