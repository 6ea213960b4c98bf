use std::time::Duration;

use cpg_common::Secret;
use log::*;

const DEFAULT_GATEWAY_URL: &str = "https://api.razorpay.com";
const DEFAULT_GATEWAY_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base url of the gateway REST API, without a trailing slash.
    pub base_url: String,
    /// The public key id. This is also handed to the checkout widget.
    pub key_id: String,
    /// The key secret. Used for basic auth against the REST API and for signing payment confirmations.
    pub key_secret: Secret<String>,
    /// Upper bound on every request to the gateway.
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_URL.to_string(),
            key_id: String::default(),
            key_secret: Secret::default(),
            timeout: DEFAULT_GATEWAY_TIMEOUT,
        }
    }
}

impl GatewayConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("CPG_GATEWAY_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| {
                info!("CPG_GATEWAY_URL not set, using {DEFAULT_GATEWAY_URL}");
                DEFAULT_GATEWAY_URL.to_string()
            });
        let key_id = std::env::var("CPG_GATEWAY_KEY_ID").unwrap_or_else(|_| {
            warn!("CPG_GATEWAY_KEY_ID not set. Orders cannot be created until it is configured");
            String::default()
        });
        let key_secret = Secret::new(std::env::var("CPG_GATEWAY_KEY_SECRET").unwrap_or_else(|_| {
            warn!("CPG_GATEWAY_KEY_SECRET not set. Orders cannot be created and no payment will verify");
            String::default()
        }));
        let timeout = std::env::var("CPG_GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| {
                s.parse::<u64>()
                    .map_err(|e| warn!("Invalid value for CPG_GATEWAY_TIMEOUT_SECS ({s}). {e}"))
                    .ok()
            })
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_GATEWAY_TIMEOUT);
        Self { base_url, key_id, key_secret, timeout }
    }
}
