//! Value types shared by the settlement engine, the outbound HTTP tools and the server.
mod gateway_status;
mod helpers;
mod money;
mod op;
mod secret;

pub use gateway_status::{GatewayStatus, PaymentStatusReport};
pub use helpers::{parse_boolean_flag, parse_number};
pub use money::{Money, MoneyConversionError, CURRENCY_DECIMALS};
pub use secret::Secret;
