use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use settlement_common::{Money, Secret};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid {kind}: {value}")]
pub struct ConversionError {
    kind: &'static str,
    value: String,
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// The order has been placed but not paid for yet.
    Pending,
    /// Payment has been received and the order is being prepared.
    Processing,
    Shipped,
    Delivered,
    /// The order was cancelled, either by an operator or because the payment failed or expired.
    Cancelled,
    Refunded,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Refunded => write!(f, "refunded"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "shipped" => Ok(Self::Shipped),
            "delivered" => Ok(Self::Delivered),
            "cancelled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            _ => Err(ConversionError { kind: "order status", value: s.to_string() }),
        }
    }
}

impl OrderStatusType {
    /// True for the statuses an order can legitimately have once it has been paid for.
    pub fn is_post_payment(&self) -> bool {
        matches!(self, Self::Processing | Self::Shipped | Self::Delivered | Self::Refunded)
    }
}

//--------------------------------------  PaymentStatusType    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatusType {
    Pending,
    /// The gateway approved the payment. This value is write-once.
    Paid,
    Failed,
    Expired,
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Paid => write!(f, "paid"),
            Self::Failed => write!(f, "failed"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

impl FromStr for PaymentStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "expired" => Ok(Self::Expired),
            _ => Err(ConversionError { kind: "payment status", value: s.to_string() }),
        }
    }
}

//--------------------------------------     HistorySource     ---------------------------------------------------------
/// What caused a status history entry to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum HistorySource {
    /// The reconciliation job pulled the status from the payment gateway.
    Gateway,
    /// A payment notifier pushed the status to us.
    Notification,
    /// An operator edited the order by hand.
    Admin,
    /// The order was left unpaid for too long.
    Expiry,
}

impl Display for HistorySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gateway => write!(f, "gateway"),
            Self::Notification => write!(f, "notification"),
            Self::Admin => write!(f, "admin"),
            Self::Expiry => write!(f, "expiry"),
        }
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    /// `None` for guest checkouts.
    pub user_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub reseller_id: Option<i64>,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatusType,
    pub payment_id: Option<String>,
    pub external_reference: Option<String>,
    pub payment_method: Option<String>,
    #[sqlx(try_from = "String")]
    pub total_amount: Money,
    #[sqlx(try_from = "String")]
    pub shipping_amount: Money,
    #[sqlx(try_from = "String")]
    pub tax_amount: Money,
    /// Storage path of an uploaded shipping label, if the shipping method needed one.
    pub shipping_label_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Already paid, or cancelled because the payment window expired. Payment notifications for these orders are
    /// acknowledged and ignored.
    pub fn is_settled(&self) -> bool {
        self.payment_status == PaymentStatusType::Paid
            || (self.status == OrderStatusType::Cancelled && self.payment_status == PaymentStatusType::Expired)
    }
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
/// An order as captured at checkout. Orders are created by the storefront, so outside of tests this is mostly used to
/// seed data.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: String,
    pub user_id: Option<String>,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub reseller_id: Option<i64>,
    pub payment_id: Option<String>,
    pub external_reference: Option<String>,
    pub payment_method: Option<String>,
    pub shipping_amount: Money,
    pub tax_amount: Money,
    pub shipping_label_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<NewOrderItem>,
}

impl NewOrder {
    pub fn new<S: Into<String>>(order_number: S) -> Self {
        Self {
            order_number: order_number.into(),
            user_id: None,
            customer_name: None,
            customer_email: None,
            customer_phone: None,
            reseller_id: None,
            payment_id: None,
            external_reference: None,
            payment_method: None,
            shipping_amount: Money::zero(),
            tax_amount: Money::zero(),
            shipping_label_path: None,
            created_at: Utc::now(),
            items: Vec::new(),
        }
    }

    pub fn with_payment_id<S: Into<String>>(mut self, payment_id: S) -> Self {
        self.payment_id = Some(payment_id.into());
        self
    }

    pub fn with_external_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.external_reference = Some(reference.into());
        self
    }

    pub fn with_user<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_guest_details(mut self, name: &str, email: &str, phone: &str) -> Self {
        self.customer_name = Some(name.to_string());
        self.customer_email = Some(email.to_string());
        self.customer_phone = Some(phone.to_string());
        self
    }

    pub fn with_reseller(mut self, reseller_id: i64) -> Self {
        self.reseller_id = Some(reseller_id);
        self
    }

    pub fn with_payment_method<S: Into<String>>(mut self, method: S) -> Self {
        self.payment_method = Some(method.into());
        self
    }

    pub fn with_shipping_and_tax(mut self, shipping: Money, tax: Money) -> Self {
        self.shipping_amount = shipping;
        self.tax_amount = tax;
        self
    }

    pub fn with_shipping_label<S: Into<String>>(mut self, path: S) -> Self {
        self.shipping_label_path = Some(path.into());
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_item(mut self, item: NewOrderItem) -> Self {
        self.items.push(item);
        self
    }

    /// The order total is always derived from the line items, shipping and tax.
    pub fn total_amount(&self) -> Money {
        self.items.iter().map(NewOrderItem::total_price).sum::<Money>() + self.shipping_amount + self.tax_amount
    }
}

//--------------------------------------   ProductSnapshot     ---------------------------------------------------------
/// Product attributes copied into the order item when the order was placed. Settlement math uses these rather than
/// the live product, which may have changed since.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub name: String,
    pub sku: Option<String>,
    pub cost_price: Option<Money>,
    pub image_url: Option<String>,
}

impl ProductSnapshot {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self { name: name.into(), sku: None, cost_price: None, image_url: None }
    }

    pub fn with_sku<S: Into<String>>(mut self, sku: S) -> Self {
        self.sku = Some(sku.into());
        self
    }

    pub fn with_cost_price(mut self, cost: Money) -> Self {
        self.cost_price = Some(cost);
        self
    }

    pub fn with_image_url<S: Into<String>>(mut self, url: S) -> Self {
        self.image_url = Some(url.into());
        self
    }
}

//--------------------------------------      OrderItem        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    pub total_price: Money,
    pub snapshot: ProductSnapshot,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price: Money,
    pub snapshot: ProductSnapshot,
}

impl NewOrderItem {
    pub fn new(product_id: i64, quantity: i64, unit_price: Money, snapshot: ProductSnapshot) -> Self {
        Self { product_id, quantity, unit_price, snapshot }
    }

    pub fn total_price(&self) -> Money {
        self.unit_price * self.quantity
    }
}

//--------------------------------------  StatusHistoryEntry   ---------------------------------------------------------
/// An append-only audit record. One is written for every effective status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StatusHistoryEntry {
    pub id: i64,
    pub order_id: i64,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatusType,
    pub note: Option<String>,
    pub source: HistorySource,
    pub created_at: DateTime<Utc>,
}

//-------------------------------------- WebhookSubscription   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct WebhookSubscription {
    pub id: i64,
    pub event_type: String,
    pub webhook_url: Option<String>,
    pub active: bool,
    #[sqlx(try_from = "String")]
    pub secret_token: Secret<String>,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub last_status_code: Option<i64>,
    pub last_error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookSubscription {
    /// Deliveries only happen for active subscriptions that have somewhere to deliver to.
    pub fn delivery_url(&self) -> Option<&str> {
        if !self.active {
            return None;
        }
        self.webhook_url.as_deref().filter(|u| !u.trim().is_empty())
    }

    /// A view of the subscription that is safe to hand to operators. Only the last four characters of the secret are
    /// shown.
    pub fn summary(&self) -> WebhookSubscriptionSummary {
        let secret = self.secret_token.reveal();
        let tail = secret.char_indices().rev().nth(3).map(|(i, _)| &secret[i..]).unwrap_or_default();
        WebhookSubscriptionSummary {
            event_type: self.event_type.clone(),
            webhook_url: self.webhook_url.clone(),
            active: self.active,
            secret_hint: format!("****{tail}"),
            last_triggered_at: self.last_triggered_at,
            last_status_code: self.last_status_code,
            last_error_message: self.last_error_message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookSubscriptionSummary {
    pub event_type: String,
    pub webhook_url: Option<String>,
    pub active: bool,
    pub secret_hint: String,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub last_status_code: Option<i64>,
    pub last_error_message: Option<String>,
}

//--------------------------------------    CustomerProfile    ---------------------------------------------------------
/// A registered user's profile, as kept by the account service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CustomerProfile {
    pub user_id: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------        Reseller       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Reseller {
    pub id: i64,
    pub name: String,
    pub slug: Option<String>,
}
