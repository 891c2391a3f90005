use crate::{
    db_types::{CustomerProfile, Reseller},
    traits::SettlementError,
};

/// Read-only lookups into the account and storefront data owned by the rest of the marketplace.
#[allow(async_fn_in_trait)]
pub trait CustomerDirectory: Clone {
    async fn fetch_customer_profile(&self, user_id: &str) -> Result<Option<CustomerProfile>, SettlementError>;

    async fn fetch_reseller(&self, reseller_id: i64) -> Result<Option<Reseller>, SettlementError>;
}
