mod gateway;
mod labels;
mod notifications;
mod webhooks;

pub use gateway::{to_gateway_error, GatewayStatusAdapter};
pub use labels::HmacLabelSigner;
pub use notifications::{create_notification_event_handlers, ServerNotificationApi, NOTIFICATION_EVENT_BUFFER_SIZE};
pub use webhooks::HttpWebhookTransport;
