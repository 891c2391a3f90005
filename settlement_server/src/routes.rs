//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every database and network call is therefore async, including the
//! gateway calls made during a manual reconciliation run.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use settlement_engine::{
    traits::{
        NotificationBackend,
        PaymentStatusProvider,
        SettlementDatabase,
        SubscriptionUpdate,
        WebhookManagement,
        WebhookTransport,
    },
    DispatchOutcome,
    NotificationApi,
    OrderFlowApi,
    ReconciliationApi,
    SettlementApi,
    WebhookApi,
};

use crate::{
    config::ServerOptions,
    data_objects::{
        JsonResponse,
        PaymentWebhookRequest,
        PaymentWebhookResponse,
        RotatedSecret,
        StatusChangeRequest,
        UserInactiveRequest,
        WebhookConfigRequest,
    },
    errors::ServerError,
    helpers::get_remote_ip,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Payment notifications  ----------------------------------------------
route!(payment_webhook => Post "/payment" impl SettlementDatabase);
/// Inbound payment notification.
///
/// The payment notifier posts `{ paymentId, status, amount?, external_reference?, payment_method? }` here whenever a
/// payment changes state. The order is located by payment id, falling back to the external reference, and the
/// reported status is fed into the order state machine.
///
/// ## Returns
/// * 400 if `paymentId` or `status` is missing, or the body is not JSON.
/// * 404 if no order matches.
/// * 200 with the resulting order status otherwise. Notifications for orders that are already settled are
///   acknowledged with `"message": "no-op, already settled"` and change nothing.
/// * 500 if the order could not be updated.
pub async fn payment_webhook<B: SettlementDatabase>(
    req: HttpRequest,
    options: web::Data<ServerOptions>,
    api: web::Data<OrderFlowApi<B>>,
    body: web::Bytes,
) -> Result<HttpResponse, ServerError> {
    let peer = get_remote_ip(&req, options.use_x_forwarded_for, options.use_forwarded);
    trace!("💻️ Received payment notification from {peer:?}");
    let request = serde_json::from_slice::<PaymentWebhookRequest>(&body).map_err(|e| {
        debug!("💻️ Could not deserialize payment notification. {e}");
        ServerError::InvalidRequestBody(e.to_string())
    })?;
    info!(
        "💻️ Payment notification: payment {} is '{}'",
        request.payment_id.as_deref().unwrap_or("<missing>"),
        request.status.as_deref().unwrap_or("<missing>")
    );
    let outcome = api.process_payment_notification(request.into()).await.map_err(|e| {
        warn!("💻️ Could not process payment notification. {e}");
        e
    })?;
    let response = PaymentWebhookResponse::from(&outcome);
    debug!("💻️ Payment notification result for {}: {}", response.order_number, response.message);
    Ok(HttpResponse::Ok().json(response))
}

//----------------------------------------------   Reconciliation  ----------------------------------------------------
route!(reconcile => Post "/reconcile" impl SettlementDatabase, PaymentStatusProvider);
/// Runs one reconciliation batch immediately and returns the report: `{ checked, updated, errors, details[] }`.
pub async fn reconcile<B, G>(api: web::Data<ReconciliationApi<B, G>>) -> Result<HttpResponse, ServerError>
where
    B: SettlementDatabase,
    G: PaymentStatusProvider,
{
    info!("💻️ Manual reconciliation run requested");
    let report = api.run_once().await?;
    Ok(HttpResponse::Ok().json(report))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(order_by_id => Get "/orders/{id}" impl SettlementDatabase);
pub async fn order_by_id<B: SettlementDatabase>(
    path: web::Path<i64>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order = api.order(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(order_fees => Get "/orders/{id}/fees" impl SettlementDatabase);
/// The fee breakdown for an order: transaction fee, contingency reserve, cost of goods and profit, per item and in
/// total. `is_estimated` is true when any item's cost price had to be estimated.
pub async fn order_fees<B: SettlementDatabase>(
    path: web::Path<i64>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    trace!("💻️ Fee breakdown requested for order {order_id}");
    let breakdown = api.fee_breakdown(order_id).await?;
    Ok(HttpResponse::Ok().json(breakdown))
}

route!(order_history => Get "/orders/{id}/history" impl SettlementDatabase);
pub async fn order_history<B: SettlementDatabase>(
    path: web::Path<i64>,
    api: web::Data<SettlementApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let history = api.history(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(history))
}

route!(update_order_status => Post "/orders/{id}/status" impl SettlementDatabase);
/// Administrative status edit, e.g. `processing -> shipped`. The payment status is never touched.
///
/// Setting an order to the status it already has is a 409.
pub async fn update_order_status<B: SettlementDatabase>(
    path: web::Path<i64>,
    body: web::Json<StatusChangeRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let StatusChangeRequest { status, note } = body.into_inner();
    info!("💻️ Status change to {status} requested for order {order_id}");
    let order = api.modify_status_for_order(order_id, status, note).await.map_err(|e| {
        debug!("💻️ Could not change order status. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(order))
}

route!(resend_order_paid => Post "/orders/{id}/notify" impl NotificationBackend, WebhookTransport);
/// Sends the `order.paid` webhook for a paid order again, e.g. after the subscriber was down. The outcome of the
/// delivery is returned, and recorded on the subscription as usual.
pub async fn resend_order_paid<B, T>(
    path: web::Path<i64>,
    api: web::Data<NotificationApi<B, T>>,
) -> Result<HttpResponse, ServerError>
where
    B: NotificationBackend,
    T: WebhookTransport,
{
    let order_id = path.into_inner();
    info!("💻️ Manual order.paid notification requested for order {order_id}");
    let outcome = api.resend_order_paid(order_id).await?;
    Ok(HttpResponse::Ok().json(dispatch_response(outcome, "order.paid")))
}

//----------------------------------------------   User notifications  ------------------------------------------------
route!(notify_user_created => Post "/users/{user_id}/notify/created" impl NotificationBackend, WebhookTransport);
/// Sends `user.created` for a registered customer. The account system calls this after sign-up.
pub async fn notify_user_created<B, T>(
    path: web::Path<String>,
    api: web::Data<NotificationApi<B, T>>,
) -> Result<HttpResponse, ServerError>
where
    B: NotificationBackend,
    T: WebhookTransport,
{
    let user_id = path.into_inner();
    info!("💻️ user.created notification requested for {user_id}");
    let outcome = api.notify_user_created_for(&user_id).await?;
    Ok(HttpResponse::Ok().json(dispatch_response(outcome, "user.created")))
}

route!(notify_user_inactive => Post "/users/{user_id}/notify/inactive" impl NotificationBackend, WebhookTransport);
/// Sends `user.inactive.<days>d` for a registered customer. Body: `{ inactive_days, last_seen_at? }`.
pub async fn notify_user_inactive<B, T>(
    path: web::Path<String>,
    body: web::Json<UserInactiveRequest>,
    api: web::Data<NotificationApi<B, T>>,
) -> Result<HttpResponse, ServerError>
where
    B: NotificationBackend,
    T: WebhookTransport,
{
    let user_id = path.into_inner();
    let UserInactiveRequest { inactive_days, last_seen_at } = body.into_inner();
    info!("💻️ user.inactive notification requested for {user_id} ({inactive_days} days)");
    let outcome = api.notify_user_inactive_for(&user_id, inactive_days, last_seen_at).await?;
    let event_type = format!("user.inactive.{inactive_days}d");
    Ok(HttpResponse::Ok().json(dispatch_response(outcome, &event_type)))
}

fn dispatch_response(outcome: DispatchOutcome, event_type: &str) -> JsonResponse {
    match outcome {
        DispatchOutcome::Delivered { status } => JsonResponse::success(format!("Delivered. Subscriber answered {status}")),
        DispatchOutcome::Failed { status: Some(status), error } => {
            JsonResponse::failure(format!("Subscriber answered {status}. {error}"))
        },
        DispatchOutcome::Failed { status: None, error } => JsonResponse::failure(format!("Not delivered. {error}")),
        DispatchOutcome::Skipped => JsonResponse::failure(format!("There is no active {event_type} subscription")),
    }
}

//----------------------------------------------   Webhook subscriptions  ----------------------------------------------
route!(webhook_subscriptions => Get "/webhooks" impl WebhookManagement);
/// Lists the webhook subscriptions. Secrets are masked.
pub async fn webhook_subscriptions<B: WebhookManagement>(
    api: web::Data<WebhookApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let subscriptions = api.subscriptions().await?;
    Ok(HttpResponse::Ok().json(subscriptions))
}

route!(configure_webhook => Put "/webhooks/{event_type}" impl WebhookManagement);
/// Sets the delivery URL and/or the active flag of a subscription, creating it if necessary.
///
/// An empty `webhook_url` clears the URL. A subscription can't be activated without a URL.
pub async fn configure_webhook<B: WebhookManagement>(
    path: web::Path<String>,
    body: web::Json<WebhookConfigRequest>,
    api: web::Data<WebhookApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let event_type = path.into_inner();
    let WebhookConfigRequest { webhook_url, active } = body.into_inner();
    info!("💻️ Webhook configuration change for {event_type}");
    let update = SubscriptionUpdate { event_type, webhook_url, active };
    let summary = api.configure(update).await?;
    Ok(HttpResponse::Ok().json(summary))
}

route!(rotate_webhook_secret => Post "/webhooks/{event_type}/rotate" impl WebhookManagement);
/// Replaces a subscription's signing secret. The new secret is returned in full, once.
pub async fn rotate_webhook_secret<B: WebhookManagement>(
    path: web::Path<String>,
    api: web::Data<WebhookApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let event_type = path.into_inner();
    info!("💻️ Rotating the signing secret for {event_type}");
    let secret_token = api.rotate_secret(&event_type).await?;
    Ok(HttpResponse::Ok().json(RotatedSecret { event_type, secret_token }))
}
