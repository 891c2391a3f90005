use std::time::Duration;

use log::*;
use settlement_common::{parse_number, Secret};

pub const DEFAULT_GATEWAY_URL: &str = "https://api.mercadopago.com";
pub const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base url of the gateway REST API, without a trailing path. e.g. "https://api.mercadopago.com"
    pub base_url: String,
    /// Bearer token used for every request.
    pub access_token: Secret<String>,
    /// Upper bound for a single status request, including connecting and reading the body.
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GATEWAY_URL.to_string(),
            access_token: Secret::default(),
            timeout: Duration::from_secs(DEFAULT_GATEWAY_TIMEOUT_SECS),
        }
    }
}

impl GatewayConfig {
    pub fn new<S: Into<String>>(base_url: S, access_token: Secret<String>, timeout: Duration) -> Self {
        Self { base_url: base_url.into(), access_token, timeout }
    }

    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("SPG_GATEWAY_URL").unwrap_or_else(|_| {
            warn!("🪛️ SPG_GATEWAY_URL not set, using {DEFAULT_GATEWAY_URL} as default");
            DEFAULT_GATEWAY_URL.to_string()
        });
        let access_token = Secret::new(std::env::var("SPG_GATEWAY_ACCESS_TOKEN").unwrap_or_else(|_| {
            warn!("🪛️ SPG_GATEWAY_ACCESS_TOKEN not set. Every gateway status query is going to be rejected.");
            String::default()
        }));
        let timeout = parse_number(std::env::var("SPG_GATEWAY_TIMEOUT_SECS").ok(), DEFAULT_GATEWAY_TIMEOUT_SECS)
            .unwrap_or_else(|e| {
                warn!(
                    "🪛️ Invalid value for SPG_GATEWAY_TIMEOUT_SECS. {e}. Using the default of \
                     {DEFAULT_GATEWAY_TIMEOUT_SECS}s."
                );
                DEFAULT_GATEWAY_TIMEOUT_SECS
            });
        Self { base_url: base_url.trim_end_matches('/').to_string(), access_token, timeout: Duration::from_secs(timeout) }
    }
}
