use std::{env, fmt::Display, str::FromStr, time::Duration};

use log::*;
use market_engine::{
    db_types::{MissingProductPolicy, OrderHistoryScope},
    OrderFlowOptions,
};
use mkt_common::parse_boolean_flag;

const DEFAULT_MKT_HOST: &str = "127.0.0.1";
const DEFAULT_MKT_PORT: u16 = 8370;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/market.db";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(600);
const DEFAULT_EVENT_BUFFER: usize = 50;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub db_max_connections: u32,
    /// Every engine call must finish within this time, or the request fails with a 503.
    pub request_timeout: Duration,
    /// How often product rating aggregates are rebuilt from the reviews. `None` disables the worker.
    pub reconcile_interval: Option<Duration>,
    /// When true, checkout and direct purchase push the purchased items into every one of the user's orders.
    /// **Legacy behaviour**
    pub legacy_order_history: bool,
    pub missing_product_policy: MissingProductPolicy,
    pub event_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_MKT_HOST.to_string(),
            port: DEFAULT_MKT_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            reconcile_interval: Some(DEFAULT_RECONCILE_INTERVAL),
            legacy_order_history: false,
            missing_product_policy: MissingProductPolicy::default(),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl ServerConfig {
    pub fn from_env_or_default() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from `lookup`, which returns the value of the named variable if it is set. Invalid
    /// values are logged and replaced by the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let host = lookup("MKT_HOST").unwrap_or_else(|| DEFAULT_MKT_HOST.into());
        let port = parse_or_default(&lookup, "MKT_PORT", DEFAULT_MKT_PORT);
        let database_url = lookup("MKT_DATABASE_URL").unwrap_or_else(|| {
            warn!("🪛️ MKT_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.into()
        });
        let db_max_connections = parse_or_default(&lookup, "MKT_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS);
        let request_timeout = seconds_or_default(&lookup, "MKT_REQUEST_TIMEOUT", DEFAULT_REQUEST_TIMEOUT);
        let request_timeout = if request_timeout.is_zero() {
            let default = DEFAULT_REQUEST_TIMEOUT.as_secs();
            warn!("🪛️ MKT_REQUEST_TIMEOUT cannot be zero. Using the default of {default}s.");
            DEFAULT_REQUEST_TIMEOUT
        } else {
            request_timeout
        };
        let reconcile_interval = seconds_or_default(&lookup, "MKT_RECONCILE_INTERVAL", DEFAULT_RECONCILE_INTERVAL);
        let reconcile_interval = if reconcile_interval.is_zero() {
            info!("🪛️ MKT_RECONCILE_INTERVAL is 0. Rating reconciliation is disabled.");
            None
        } else {
            Some(reconcile_interval)
        };
        let legacy_order_history = parse_boolean_flag(lookup("MKT_LEGACY_ORDER_HISTORY"), false);
        if legacy_order_history {
            warn!(
                "🪛️ MKT_LEGACY_ORDER_HISTORY is on. Purchased items will be added to EVERY order in a user's history. \
                 Only use this to stay compatible with old clients."
            );
        }
        let missing_product_policy = lookup("MKT_MISSING_PRODUCT_POLICY")
            .and_then(|s| {
                s.parse::<MissingProductPolicy>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for MKT_MISSING_PRODUCT_POLICY. {e}"))
                    .ok()
            })
            .unwrap_or_default();
        let event_buffer = parse_or_default(&lookup, "MKT_EVENT_BUFFER", DEFAULT_EVENT_BUFFER).max(1);
        Self {
            host,
            port,
            database_url,
            db_max_connections,
            request_timeout,
            reconcile_interval,
            legacy_order_history,
            missing_product_policy,
            event_buffer,
        }
    }

    pub fn order_flow_options(&self) -> OrderFlowOptions {
        let scope =
            if self.legacy_order_history { OrderHistoryScope::AllOrders } else { OrderHistoryScope::NewOrderOnly };
        OrderFlowOptions { scope, missing_product: self.missing_product_policy }
    }
}

fn parse_or_default<F, T>(lookup: &F, name: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    match lookup(name) {
        None => default,
        Some(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
    }
}

fn seconds_or_default<F>(lookup: &F, name: &str, default: Duration) -> Duration
where F: Fn(&str) -> Option<String> {
    Duration::from_secs(parse_or_default(lookup, name, default.as_secs()))
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that the route handlers need. Generally we try to keep this as small as
/// possible.
#[derive(Clone, Copy, Debug)]
pub struct ServerOptions {
    pub request_timeout: Duration,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self { request_timeout: DEFAULT_REQUEST_TIMEOUT }
    }
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { request_timeout: config.request_timeout }
    }
}
