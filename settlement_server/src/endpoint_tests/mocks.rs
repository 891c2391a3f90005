use chrono::{DateTime, Utc};
use mockall::mock;
use settlement_common::{Money, PaymentStatusReport};
use settlement_engine::{
    db_types::{
        CustomerProfile,
        NewOrder,
        Order,
        OrderItem,
        Reseller,
        StatusHistoryEntry,
        WebhookSubscription,
    },
    traits::{
        CustomerDirectory,
        DeliveryError,
        DeliveryRecord,
        DeliveryResponse,
        GatewayError,
        PaymentStatusProvider,
        PaymentUpdate,
        SettlementDatabase,
        SettlementError,
        StatusUpdate,
        SubscriptionUpdate,
        WebhookManagement,
        WebhookRequest,
        WebhookTransport,
    },
};

mock! {
    pub SettlementDb {}
    impl Clone for SettlementDb {
        fn clone(&self) -> Self;
    }
    impl SettlementDatabase for SettlementDb {
        fn url(&self) -> &str;
        async fn fetch_order(&self, id: i64) -> Result<Option<Order>, SettlementError>;
        async fn fetch_order_by_number(&self, order_number: &str) -> Result<Option<Order>, SettlementError>;
        async fn fetch_order_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, SettlementError>;
        async fn fetch_order_by_external_reference(&self, reference: &str) -> Result<Option<Order>, SettlementError>;
        async fn fetch_reconcilable_orders(&self, limit: u32) -> Result<Vec<Order>, SettlementError>;
        async fn fetch_unpaid_orders_created_before(&self, cutoff: DateTime<Utc>, limit: u32) -> Result<Vec<Order>, SettlementError>;
        async fn apply_payment_update(&self, update: PaymentUpdate) -> Result<Option<Order>, SettlementError>;
        async fn apply_status_update(&self, update: StatusUpdate) -> Result<Option<Order>, SettlementError>;
        async fn fetch_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, SettlementError>;
        async fn fetch_status_history(&self, order_id: i64) -> Result<Vec<StatusHistoryEntry>, SettlementError>;
        async fn fetch_product_cost(&self, product_id: i64) -> Result<Option<Money>, SettlementError>;
        async fn insert_order(&self, order: NewOrder) -> Result<Order, SettlementError>;
    }
    impl WebhookManagement for SettlementDb {
        async fn fetch_subscription(&self, event_type: &str) -> Result<Option<WebhookSubscription>, SettlementError>;
        async fn fetch_subscriptions(&self) -> Result<Vec<WebhookSubscription>, SettlementError>;
        async fn upsert_subscription(&self, update: SubscriptionUpdate, new_secret: &str) -> Result<WebhookSubscription, SettlementError>;
        async fn rotate_secret(&self, event_type: &str, new_secret: &str) -> Result<Option<WebhookSubscription>, SettlementError>;
        async fn record_delivery(&self, event_type: &str, record: DeliveryRecord) -> Result<(), SettlementError>;
    }
    impl CustomerDirectory for SettlementDb {
        async fn fetch_customer_profile(&self, user_id: &str) -> Result<Option<CustomerProfile>, SettlementError>;
        async fn fetch_reseller(&self, reseller_id: i64) -> Result<Option<Reseller>, SettlementError>;
    }
}

mock! {
    pub Gateway {}
    impl PaymentStatusProvider for Gateway {
        async fn fetch_status(&self, payment_reference: &str) -> Result<PaymentStatusReport, GatewayError>;
    }
}

mock! {
    pub Transport {}
    impl WebhookTransport for Transport {
        async fn deliver(&self, request: &WebhookRequest) -> Result<DeliveryResponse, DeliveryError>;
    }
}
