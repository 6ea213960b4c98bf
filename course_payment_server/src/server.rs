use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use course_payment_engine::{
    events::{EventHandlers, EventProducers},
    helpers::SignatureVerifier,
    traits::{PaymentBackend, PaymentGateway},
    CourseApi,
    PaymentFlowApi,
    SqliteDatabase,
};
use cpg_common::Secret;
use log::*;

use crate::{
    config::ServerConfig,
    errors::ServerError,
    expiry_worker::start_expiry_worker,
    integrations::{gateway::HostedGateway, notifications::create_notification_event_handlers},
    middleware::{AdminToken, HmacMiddlewareFactory, GATEWAY_SIGNATURE_HEADER},
    routes::{
        health,
        BeginCheckoutRoute,
        CheckoutCallbackRoute,
        CourseRoute,
        CreateOrderRoute,
        EnrollFreeRoute,
        EnrollmentsRoute,
        PaymentWebhookRoute,
        RefundRoute,
        StudentTransactionsRoute,
        TransactionRoute,
        UpsertCourseRoute,
    },
};

/// The parts of the server configuration that the routes themselves need.
#[derive(Clone, Debug)]
pub struct RouteConfig {
    pub webhook_secret: Secret<String>,
    pub webhook_hmac_checks: bool,
    pub admin_token: AdminToken,
}

impl From<&ServerConfig> for RouteConfig {
    fn from(config: &ServerConfig) -> Self {
        Self {
            webhook_secret: config.webhook_secret.clone(),
            webhook_hmac_checks: config.webhook_hmac_checks,
            admin_token: AdminToken::new(config.admin_token.clone()),
        }
    }
}

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    if config.run_migrations {
        db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Database migration failed. {e}")))?;
    }
    let gateway = HostedGateway::new(config.gateway.clone())?;
    let verifier = SignatureVerifier::new(config.gateway.key_secret.clone());
    let producers = match &config.notification_url {
        Some(url) => {
            let handlers = create_notification_event_handlers(url)?;
            let producers = handlers.producers();
            let _handles = EventHandlers::start_handlers(handlers);
            info!("📬️ Lifecycle notifications will be sent to {url}");
            producers
        },
        None => EventProducers::default(),
    };
    let api = PaymentFlowApi::new(db, gateway, verifier, config.currency.as_str(), producers);
    // The worker shares the checkout tracker with the request handlers
    let _expiry_worker = start_expiry_worker(api.clone(), config.pending_transaction_timeout);
    let srv = create_server_instance(config, api)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    api: PaymentFlowApi<SqliteDatabase, HostedGateway>,
) -> Result<Server, ServerError> {
    let routes = RouteConfig::from(&config);
    let srv = HttpServer::new(move || {
        let api = api.clone();
        let routes = routes.clone();
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("cpg::access_log"))
            .configure(move |cfg| configure_routes(cfg, api, routes))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Registers the API objects and every route of the payment server.
pub fn configure_routes<B, G>(cfg: &mut web::ServiceConfig, api: PaymentFlowApi<B, G>, routes: RouteConfig)
where
    B: PaymentBackend + 'static,
    G: PaymentGateway + 'static,
{
    let courses = CourseApi::new(api.db().clone());
    let enrollments = api.enrollments().clone();
    let transactions = api.transactions().clone();
    let webhook_scope = web::scope("/webhook")
        .wrap(HmacMiddlewareFactory::new(GATEWAY_SIGNATURE_HEADER, routes.webhook_secret, routes.webhook_hmac_checks))
        .service(PaymentWebhookRoute::<B, G>::new());
    cfg.app_data(web::Data::new(api))
        .app_data(web::Data::new(courses))
        .app_data(web::Data::new(enrollments))
        .app_data(web::Data::new(transactions))
        .app_data(web::Data::new(routes.admin_token))
        .service(health)
        .service(CourseRoute::<B>::new())
        .service(UpsertCourseRoute::<B>::new())
        .service(CreateOrderRoute::<B, G>::new())
        // Must be registered before `/checkout/{transaction_id}`
        .service(CheckoutCallbackRoute::<B, G>::new())
        .service(BeginCheckoutRoute::<B, G>::new())
        .service(EnrollFreeRoute::<B>::new())
        .service(EnrollmentsRoute::<B>::new())
        .service(TransactionRoute::<B>::new())
        .service(StudentTransactionsRoute::<B, G>::new())
        .service(RefundRoute::<B, G>::new())
        .service(webhook_scope);
}
