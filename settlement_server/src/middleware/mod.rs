mod admin;
mod hmac;
mod whitelist;

pub use admin::{check_bearer_token, AdminTokenMiddlewareFactory, AdminTokenMiddlewareService};
pub use hmac::{HmacMiddlewareFactory, HmacMiddlewareService, NOTIFICATION_SIGNATURE_HEADER};
pub use whitelist::{is_whitelisted, PeerWhitelistMiddlewareFactory, PeerWhitelistMiddlewareService};
