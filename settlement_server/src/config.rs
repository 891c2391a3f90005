use std::{env, net::IpAddr, str::FromStr, time::Duration};

use gateway_tools::GatewayConfig;
use log::*;
use rust_decimal::Decimal;
use settlement_common::{parse_boolean_flag, parse_number, Secret};
use settlement_engine::{fees::FeeRates, helpers::generate_secret, reconciliation_objects::ReconciliationConfig};

const DEFAULT_SPG_HOST: &str = "127.0.0.1";
const DEFAULT_SPG_PORT: u16 = 8470;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/settlement.db";
const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RECONCILIATION_INTERVAL_SECS: u64 = 300;
const DEFAULT_RECONCILIATION_BATCH_SIZE: u32 = 50;
const DEFAULT_UNPAID_ORDER_TIMEOUT_HOURS: i64 = 72;
const DEFAULT_LABEL_BASE_URL: &str = "http://localhost/labels";
const DEFAULT_LABEL_URL_TTL_SECS: i64 = 3600;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Bearer token for the `/admin` routes. If empty, every admin request is refused.
    pub admin_token: Secret<String>,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address.
    pub use_forwarded: bool,
    pub gateway: GatewayConfig,
    /// Upper bound on a single outbound webhook delivery.
    pub webhook_timeout: Duration,
    pub fee_rates: FeeRates,
    pub reconciliation: ReconciliationConfig,
    /// How often the background worker runs a reconciliation batch.
    pub reconciliation_interval: Duration,
    pub disable_reconciliation_worker: bool,
    /// Pending orders older than this are expired by the background worker. `None` disables expiry.
    pub unpaid_order_timeout: Option<chrono::Duration>,
    pub notifier: NotifierConfig,
    pub labels: LabelConfig,
}

/// Settings for the inbound payment notification route.
#[derive(Clone, Debug, Default)]
pub struct NotifierConfig {
    /// Shared secret for the `X-Notification-Signature` check.
    pub hmac_secret: Secret<String>,
    pub hmac_checks: bool,
    /// If supplied, requests against `/webhooks` are checked against this list of notifier IP addresses.
    /// To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
}

/// Settings for shipping label download links.
#[derive(Clone, Debug)]
pub struct LabelConfig {
    pub base_url: String,
    pub signing_key: Secret<String>,
    pub ttl: chrono::Duration,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_LABEL_BASE_URL.to_string(),
            signing_key: Secret::new(generate_secret()),
            ttl: chrono::Duration::seconds(DEFAULT_LABEL_URL_TTL_SECS),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SPG_HOST.to_string(),
            port: DEFAULT_SPG_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            admin_token: Secret::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            gateway: GatewayConfig::default(),
            webhook_timeout: Duration::from_secs(DEFAULT_WEBHOOK_TIMEOUT_SECS),
            fee_rates: FeeRates::default(),
            reconciliation: ReconciliationConfig::default(),
            reconciliation_interval: Duration::from_secs(DEFAULT_RECONCILIATION_INTERVAL_SECS),
            disable_reconciliation_worker: false,
            unpaid_order_timeout: Some(chrono::Duration::hours(DEFAULT_UNPAID_ORDER_TIMEOUT_HOURS)),
            notifier: NotifierConfig::default(),
            labels: LabelConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SPG_HOST").ok().unwrap_or_else(|| DEFAULT_SPG_HOST.into());
        let port = env::var("SPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SPG_PORT. {e} Using the default, {DEFAULT_SPG_PORT}, instead."
                    );
                    DEFAULT_SPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SPG_PORT);
        let database_url = env::var("SPG_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ SPG_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let admin_token = Secret::new(env::var("SPG_ADMIN_TOKEN").ok().unwrap_or_else(|| {
            warn!("🪛️ SPG_ADMIN_TOKEN is not set. All requests to the admin routes will be refused.");
            String::default()
        }));
        let use_x_forwarded_for = parse_boolean_flag(env::var("SPG_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("SPG_USE_FORWARDED").ok(), false);
        let gateway = GatewayConfig::new_from_env_or_default();
        let webhook_timeout = Duration::from_secs(env_number("SPG_WEBHOOK_TIMEOUT_SECS", DEFAULT_WEBHOOK_TIMEOUT_SECS));
        let fee_rates = configure_fee_rates();
        let reconciliation = ReconciliationConfig {
            batch_size: env_number("SPG_RECONCILIATION_BATCH_SIZE", DEFAULT_RECONCILIATION_BATCH_SIZE).max(1),
            gateway_timeout: gateway.timeout,
        };
        let reconciliation_interval = Duration::from_secs(
            env_number("SPG_RECONCILIATION_INTERVAL_SECS", DEFAULT_RECONCILIATION_INTERVAL_SECS).max(1),
        );
        let disable_reconciliation_worker =
            parse_boolean_flag(env::var("SPG_DISABLE_RECONCILIATION_WORKER").ok(), false);
        let unpaid_order_timeout = configure_unpaid_order_timeout();
        let notifier = NotifierConfig::from_env_or_defaults();
        let labels = LabelConfig::from_env_or_defaults();
        Self {
            host,
            port,
            database_url,
            admin_token,
            use_x_forwarded_for,
            use_forwarded,
            gateway,
            webhook_timeout,
            fee_rates,
            reconciliation,
            reconciliation_interval,
            disable_reconciliation_worker,
            unpaid_order_timeout,
            notifier,
            labels,
        }
    }
}

impl NotifierConfig {
    pub fn from_env_or_defaults() -> Self {
        let hmac_secret = Secret::new(env::var("SPG_NOTIFICATION_HMAC_SECRET").ok().unwrap_or_default());
        let hmac_checks = parse_boolean_flag(env::var("SPG_NOTIFICATION_HMAC_CHECKS").ok(), false);
        if hmac_checks && hmac_secret.is_empty() {
            warn!(
                "🚨️ Notification HMAC checks are enabled, but SPG_NOTIFICATION_HMAC_SECRET is empty. Every payment \
                 notification is going to be rejected."
            );
        }
        let whitelist = env::var("SPG_NOTIFIER_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The notifier IP whitelist was configured, but is empty. The server will run, but won't \
                     authorise any incoming payment notifications."
                );
            },
            None => info!("🪛️ No notifier IP whitelist is set."),
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Notifier IP whitelist: {addrs}");
            },
        }
        Self { hmac_secret, hmac_checks, whitelist }
    }
}

impl LabelConfig {
    pub fn from_env_or_defaults() -> Self {
        let base_url = env::var("SPG_LABEL_BASE_URL")
            .ok()
            .unwrap_or_else(|| DEFAULT_LABEL_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let signing_key = match env::var("SPG_LABEL_SIGNING_KEY") {
            Ok(key) if !key.is_empty() => Secret::new(key),
            _ => {
                warn!(
                    "🚨️ SPG_LABEL_SIGNING_KEY is not set. I'm using a random key for this session, so shipping label \
                     links will stop working when the server restarts."
                );
                Secret::new(generate_secret())
            },
        };
        let ttl = chrono::Duration::seconds(env_number("SPG_LABEL_URL_TTL_SECS", DEFAULT_LABEL_URL_TTL_SECS).max(1));
        Self { base_url, signing_key, ttl }
    }
}

/// Parses a comma-separated list of IP addresses. "none", "false" and "0" switch the whitelist off. Invalid entries
/// are skipped.
pub fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0"].contains(&s.trim().to_lowercase().as_str()) {
        info!("🪛️ Notifier IP whitelist is disabled.");
        return None;
    }
    let ip_addrs = s
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            s.parse()
                .map_err(|e| {
                    warn!("🪛️ Ignoring invalid IP address ({s}) in SPG_NOTIFIER_IP_WHITELIST: {e}");
                })
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

fn env_number<T: FromStr + Copy + std::fmt::Display>(name: &str, default: T) -> T
where T::Err: std::fmt::Display {
    parse_number(env::var(name).ok(), default).unwrap_or_else(|e| {
        warn!("🪛️ Invalid configuration value for {name}. {e}. Using the default of {default}.");
        default
    })
}

fn configure_fee_rates() -> FeeRates {
    let defaults = FeeRates::default();
    let transaction_rate = fee_rate("SPG_TRANSACTION_FEE_RATE", defaults.transaction_rate);
    let contingency_rate = fee_rate("SPG_CONTINGENCY_FEE_RATE", defaults.contingency_rate);
    info!("🪛️ Fee rates: transaction {transaction_rate}, contingency {contingency_rate}");
    FeeRates::new(transaction_rate, contingency_rate)
}

fn fee_rate(name: &str, default: Decimal) -> Decimal {
    let Ok(s) = env::var(name) else {
        return default;
    };
    match Decimal::from_str(s.trim()) {
        Ok(rate) if rate >= Decimal::ZERO && rate < Decimal::ONE => rate,
        Ok(rate) => {
            warn!("🪛️ {name} must be a fraction between 0 and 1, but is {rate}. Using the default of {default}.");
            default
        },
        Err(e) => {
            warn!("🪛️ Invalid configuration value for {name}. {e}. Using the default of {default}.");
            default
        },
    }
}

fn configure_unpaid_order_timeout() -> Option<chrono::Duration> {
    let hours = env::var("SPG_UNPAID_ORDER_TIMEOUT_HOURS")
        .map_err(|_| {
            info!(
                "🪛️ SPG_UNPAID_ORDER_TIMEOUT_HOURS is not set. Using the default value of \
                 {DEFAULT_UNPAID_ORDER_TIMEOUT_HOURS} hrs."
            )
        })
        .and_then(|s| {
            s.trim()
                .parse::<i64>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for SPG_UNPAID_ORDER_TIMEOUT_HOURS. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_UNPAID_ORDER_TIMEOUT_HOURS);
    if hours <= 0 {
        info!("🪛️ Unpaid order expiry is disabled.");
        None
    } else {
        Some(chrono::Duration::hours(hours))
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that request handlers need. Secrets are deliberately left out.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
