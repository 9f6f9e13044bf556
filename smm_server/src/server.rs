use std::{sync::Arc, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use log::*;
use smm_engine::{events::EventProducers, LedgerApi, PaymentFlowApi, PromoApi, PurchaseApi, SqliteDatabase, TenantApi};
use smm_upstream::{AaioLinks, CryptomusClient, OrdersApi, PayokLinks, TelegramTransport};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    notifications::create_audit_event_handlers,
    rate_worker::start_rate_worker,
    reconcile_worker::start_reconcile_worker,
    routes::{
        health,
        AaioNotificationRoute,
        CreatePaymentAaioRoute,
        CreatePaymentPayokRoute,
        CreatePaymentRoute,
        PayokNotificationRoute,
        PaymentProviders,
        WebhookRoute,
    },
    supervisor::{new_tenant_channel, SupervisorConfig, UpdateHandler, WorkerSupervisor},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.run_migrations().await.map_err(|e| ServerError::InitializeError(format!("Migrations failed. {e}")))?;
    let handlers = create_audit_event_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let orders_api =
        Arc::new(OrdersApi::new(config.orders_api.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?);
    start_reconcile_worker(db.clone(), producers.clone(), orders_api.clone(), config.timers.reconcile_interval);
    start_rate_worker(db.clone(), orders_api.clone(), config.timers.rate_refresh_interval);
    if config.enable_bots {
        start_supervisor(&config, db.clone(), producers.clone(), orders_api)?;
    }

    let providers = PaymentProviders {
        cryptomus: Arc::new(
            CryptomusClient::new(config.cryptomus.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?,
        ),
        aaio: Arc::new(AaioLinks::new(config.aaio.clone())),
        payok: Arc::new(PayokLinks::new(config.payok.clone())),
    };
    let srv = create_server_instance(config, db, producers, providers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

fn start_supervisor(
    config: &ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    orders_api: Arc<OrdersApi>,
) -> Result<(), ServerError> {
    let transport =
        Arc::new(TelegramTransport::new(config.telegram.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?);
    let (notifier, new_tenants) = new_tenant_channel();
    let handler = UpdateHandler::new(
        LedgerApi::new(db.clone()),
        PromoApi::new(db.clone(), producers),
        PurchaseApi::new(db.clone(), config.markup_percent),
        TenantApi::new(db.clone()).with_notifier(notifier),
        orders_api,
        transport.clone(),
        config.channel_id,
        &config.bot_link,
    );
    let supervisor_config = SupervisorConfig::new(config.timers.supervisor_scan_interval, config.timers.worker_lease_ttl);
    let supervisor = WorkerSupervisor::new(db, transport, Arc::new(handler), new_tenants, supervisor_config);
    info!("🤖️ Starting tenant supervisor {}", supervisor.id());
    tokio::spawn(supervisor.run());
    Ok(())
}

/// Malformed JSON and form bodies are reported with the same JSON error body as every other failure.
pub fn configure_payloads(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|e, _| ServerError::CouldNotDeserializePayload(e.to_string()).into()),
    )
    .app_data(
        web::FormConfig::default()
            .error_handler(|e, _| ServerError::CouldNotDeserializePayload(e.to_string()).into()),
    );
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
    providers: PaymentProviders,
) -> Result<Server, ServerError> {
    let srv = HttpServer::new(move || {
        let payments_api = PaymentFlowApi::new(db.clone(), producers.clone());
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("smm::access_log"))
            .configure(configure_payloads)
            .app_data(web::Data::new(payments_api))
            .app_data(web::Data::new(providers.clone()))
            .service(health)
            .service(WebhookRoute::<SqliteDatabase>::new())
            .service(AaioNotificationRoute::<SqliteDatabase>::new())
            .service(PayokNotificationRoute::<SqliteDatabase>::new())
            .service(CreatePaymentRoute::<SqliteDatabase>::new())
            .service(CreatePaymentAaioRoute::<SqliteDatabase>::new())
            .service(CreatePaymentPayokRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}
