use std::{sync::Arc, time::Duration};

use actix_web::{
    dev::Server,
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use log::*;
use settlement_engine::{
    events::EventProducers,
    fees::FeeCalculator,
    NotificationApi,
    OrderFlowApi,
    ReconciliationApi,
    SettlementApi,
    SqliteDatabase,
    WebhookApi,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::{
        create_notification_event_handlers,
        GatewayStatusAdapter,
        HmacLabelSigner,
        HttpWebhookTransport,
        ServerNotificationApi,
    },
    middleware::{
        AdminTokenMiddlewareFactory,
        HmacMiddlewareFactory,
        PeerWhitelistMiddlewareFactory,
        NOTIFICATION_SIGNATURE_HEADER,
    },
    reconciliation_worker::start_reconciliation_worker,
    routes::{
        health,
        ConfigureWebhookRoute,
        NotifyUserCreatedRoute,
        NotifyUserInactiveRoute,
        OrderByIdRoute,
        OrderFeesRoute,
        OrderHistoryRoute,
        PaymentWebhookRoute,
        ReconcileRoute,
        ResendOrderPaidRoute,
        RotateWebhookSecretRoute,
        UpdateOrderStatusRoute,
        WebhookSubscriptionsRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let transport =
        HttpWebhookTransport::new(config.webhook_timeout).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let gateway =
        GatewayStatusAdapter::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let labels = HmacLabelSigner::new(&config.labels);
    let notifications = NotificationApi::new(db.clone(), transport).with_label_signer(Arc::new(labels));
    let handlers = create_notification_event_handlers(notifications.clone());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    if config.disable_reconciliation_worker {
        warn!("🕰️ The reconciliation worker is disabled. Pending orders will only change on payment notifications.");
    } else {
        let flow = OrderFlowApi::new(db.clone(), producers.clone());
        let api = ReconciliationApi::new(flow.clone(), gateway.clone(), config.reconciliation);
        let _ = start_reconciliation_worker(api, flow, config.reconciliation_interval, config.unpaid_order_timeout);
    }
    let srv = create_server_instance(config, db, producers, gateway, notifications)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    gateway: GatewayStatusAdapter,
    notifications: ServerNotificationApi,
) -> Result<Server, ServerError> {
    let (host, port) = (config.host.clone(), config.port);
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let reconciliation_api =
            ReconciliationApi::new(orders_api.clone(), gateway.clone(), config.reconciliation);
        let settlement_api = SettlementApi::new(db.clone(), FeeCalculator::new(config.fee_rates));
        let webhook_api = WebhookApi::new(db.clone());
        let options = ServerOptions::from_config(&config);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("spg::access_log"))
            .app_data(web::Data::new(options))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(reconciliation_api))
            .app_data(web::Data::new(settlement_api))
            .app_data(web::Data::new(webhook_api))
            .app_data(web::Data::new(notifications.clone()));
        // Routes that require the admin token
        let admin_scope = web::scope("/admin")
            .wrap(AdminTokenMiddlewareFactory::new(config.admin_token.clone()))
            .service(ReconcileRoute::<SqliteDatabase, GatewayStatusAdapter>::new())
            .service(OrderFeesRoute::<SqliteDatabase>::new())
            .service(OrderHistoryRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(ResendOrderPaidRoute::<SqliteDatabase, HttpWebhookTransport>::new())
            .service(NotifyUserCreatedRoute::<SqliteDatabase, HttpWebhookTransport>::new())
            .service(NotifyUserInactiveRoute::<SqliteDatabase, HttpWebhookTransport>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(WebhookSubscriptionsRoute::<SqliteDatabase>::new())
            .service(ConfigureWebhookRoute::<SqliteDatabase>::new())
            .service(RotateWebhookSecretRoute::<SqliteDatabase>::new());
        let notifier = &config.notifier;
        // The whitelist is registered last so that it runs before the signature check
        let webhook_scope = web::scope("/webhooks")
            .wrap(HmacMiddlewareFactory::new(
                NOTIFICATION_SIGNATURE_HEADER,
                notifier.hmac_secret.clone(),
                notifier.hmac_checks,
            ))
            .wrap(PeerWhitelistMiddlewareFactory::new(notifier.whitelist.clone(), options))
            .service(PaymentWebhookRoute::<SqliteDatabase>::new());
        app.service(health).service(webhook_scope).service(admin_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
