use std::env;

use chrono::Duration;
use cpg_common::{helpers::parse_boolean_flag, Secret, DEFAULT_CURRENCY_CODE};
use gateway_tools::GatewayConfig;
use log::*;

const DEFAULT_CPG_HOST: &str = "127.0.0.1";
const DEFAULT_CPG_PORT: u16 = 8380;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/course_payments.db";
const DEFAULT_PENDING_TRANSACTION_TIMEOUT: Duration = Duration::minutes(30);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// The single currency this deployment sells courses in.
    pub currency: String,
    pub gateway: GatewayConfig,
    /// Signs the raw body of every gateway webhook delivery.
    pub webhook_secret: Secret<String>,
    /// If false, webhook deliveries are accepted without checking the body signature. **DANGER**
    pub webhook_hmac_checks: bool,
    /// Required in the `cpg_admin_token` header of admin calls. Admin routes are closed when this is empty.
    pub admin_token: Secret<String>,
    /// When set, lifecycle events are POSTed here as JSON.
    pub notification_url: Option<String>,
    /// Pending transactions older than this are failed by the expiry worker.
    pub pending_transaction_timeout: Duration,
    pub run_migrations: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_CPG_HOST.to_string(),
            port: DEFAULT_CPG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            currency: DEFAULT_CURRENCY_CODE.to_string(),
            gateway: GatewayConfig::default(),
            webhook_secret: Secret::default(),
            webhook_hmac_checks: true,
            admin_token: Secret::default(),
            notification_url: None,
            pending_transaction_timeout: DEFAULT_PENDING_TRANSACTION_TIMEOUT,
            run_migrations: true,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("CPG_HOST").ok().unwrap_or_else(|| DEFAULT_CPG_HOST.into());
        let port = env::var("CPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for CPG_PORT. {e} Using the default, {DEFAULT_CPG_PORT}, instead."
                    );
                    DEFAULT_CPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_CPG_PORT);
        let database_url = env::var("CPG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ CPG_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let currency = configure_currency(env::var("CPG_CURRENCY").ok());
        let gateway = GatewayConfig::new_from_env_or_default();
        let webhook_secret = Secret::new(env::var("CPG_WEBHOOK_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ CPG_WEBHOOK_SECRET is not set. Every gateway webhook delivery will be rejected until it is \
                 configured."
            );
            String::default()
        }));
        let webhook_hmac_checks = parse_boolean_flag(env::var("CPG_WEBHOOK_HMAC_CHECKS").ok(), true);
        if !webhook_hmac_checks {
            warn!("🪛️ Webhook HMAC checks are DISABLED. Anyone can post payment confirmations to the webhook.");
        }
        let admin_token = Secret::new(env::var("CPG_ADMIN_TOKEN").ok().unwrap_or_else(|| {
            warn!("🪛️ CPG_ADMIN_TOKEN is not set. Admin routes are disabled.");
            String::default()
        }));
        let notification_url = env::var("CPG_NOTIFICATION_URL").ok().filter(|s| !s.trim().is_empty());
        if notification_url.is_none() {
            info!("🪛️ CPG_NOTIFICATION_URL is not set. Lifecycle notifications will not be sent.");
        }
        let pending_transaction_timeout = configure_pending_timeout(env::var("CPG_PENDING_TRANSACTION_TIMEOUT").ok());
        let run_migrations = parse_boolean_flag(env::var("CPG_RUN_MIGRATIONS").ok(), true);
        Self {
            host,
            port,
            database_url,
            currency,
            gateway,
            webhook_secret,
            webhook_hmac_checks,
            admin_token,
            notification_url,
            pending_transaction_timeout,
            run_migrations,
        }
    }
}

fn configure_currency(value: Option<String>) -> String {
    match value.map(|s| s.trim().to_uppercase()) {
        Some(code) if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) => code,
        Some(code) => {
            warn!("🪛️ {code} is not a valid currency code for CPG_CURRENCY. Using {DEFAULT_CURRENCY_CODE} instead.");
            DEFAULT_CURRENCY_CODE.to_string()
        },
        None => {
            info!("🪛️ CPG_CURRENCY is not set. Using {DEFAULT_CURRENCY_CODE}.");
            DEFAULT_CURRENCY_CODE.to_string()
        },
    }
}

fn configure_pending_timeout(value: Option<String>) -> Duration {
    let Some(value) = value else {
        info!(
            "🪛️ CPG_PENDING_TRANSACTION_TIMEOUT is not set. Using the default value of {} minutes.",
            DEFAULT_PENDING_TRANSACTION_TIMEOUT.num_minutes()
        );
        return DEFAULT_PENDING_TRANSACTION_TIMEOUT;
    };
    match value.trim().parse::<i64>() {
        Ok(minutes) if minutes > 0 => Duration::minutes(minutes),
        Ok(minutes) => {
            warn!("🪛️ CPG_PENDING_TRANSACTION_TIMEOUT must be positive, not {minutes}. Using the default.");
            DEFAULT_PENDING_TRANSACTION_TIMEOUT
        },
        Err(e) => {
            warn!("🪛️ Invalid configuration value for CPG_PENDING_TRANSACTION_TIMEOUT. {e}. Using the default.");
            DEFAULT_PENDING_TRANSACTION_TIMEOUT
        },
    }
}
