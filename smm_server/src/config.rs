use std::{env, time::Duration};

use log::*;
use smm_common::helpers::{parse_boolean_flag, parse_duration_secs};
use smm_upstream::{AaioConfig, CryptomusConfig, OrdersApiConfig, PayokConfig, TelegramConfig};

const DEFAULT_SMM_HOST: &str = "127.0.0.1";
const DEFAULT_SMM_PORT: u16 = 8080;
const DEFAULT_BOT_LINK: &str = "https://t.me";
const DEFAULT_RECONCILE_INTERVAL: Duration = Duration::from_secs(30 * 60);
const DEFAULT_RATE_REFRESH_INTERVAL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_SUPERVISOR_SCAN_INTERVAL: Duration = Duration::from_secs(10 * 60);
const DEFAULT_WORKER_LEASE_TTL: Duration = Duration::from_secs(120);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Percentage added to the provider's rate when pricing services
    pub markup_percent: f64,
    /// The channel id stored against accounts opened through the bots
    pub channel_id: i64,
    /// Base URL for bot deep links. Referral links are `<bot_link>/<bot name>?start=<user id>`.
    pub bot_link: String,
    /// When false, the supervisor and tenant workers are not started. The HTTP gateway and timers still run.
    pub enable_bots: bool,
    pub orders_api: OrdersApiConfig,
    pub cryptomus: CryptomusConfig,
    pub aaio: AaioConfig,
    pub payok: PayokConfig,
    pub telegram: TelegramConfig,
    pub timers: TimerConfig,
}

/// Background job schedules
#[derive(Clone, Copy, Debug)]
pub struct TimerConfig {
    pub reconcile_interval: Duration,
    pub rate_refresh_interval: Duration,
    pub supervisor_scan_interval: Duration,
    pub worker_lease_ttl: Duration,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            reconcile_interval: DEFAULT_RECONCILE_INTERVAL,
            rate_refresh_interval: DEFAULT_RATE_REFRESH_INTERVAL,
            supervisor_scan_interval: DEFAULT_SUPERVISOR_SCAN_INTERVAL,
            worker_lease_ttl: DEFAULT_WORKER_LEASE_TTL,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_SMM_HOST.to_string(),
            port: DEFAULT_SMM_PORT,
            database_url: String::default(),
            markup_percent: 0.0,
            channel_id: 0,
            bot_link: DEFAULT_BOT_LINK.to_string(),
            enable_bots: true,
            orders_api: OrdersApiConfig::default(),
            cryptomus: CryptomusConfig::default(),
            aaio: AaioConfig::default(),
            payok: PayokConfig::default(),
            telegram: TelegramConfig::default(),
            timers: TimerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("SMM_HOST").ok().unwrap_or_else(|| DEFAULT_SMM_HOST.into());
        let port = env::var("SMM_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for SMM_PORT. {e} Using the default, {DEFAULT_SMM_PORT}, instead."
                    );
                    DEFAULT_SMM_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_SMM_PORT);
        let database_url = env::var("SMM_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ SMM_DATABASE_URL is not set. Please set it to the URL for the storefront database.");
            String::default()
        });
        let markup_percent = env::var("SMM_PRICE_MARKUP_PERCENT")
            .ok()
            .and_then(|s| {
                s.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite() && *v >= 0.0)
                    .or_else(|| {
                        warn!("🪛️ Invalid configuration value for SMM_PRICE_MARKUP_PERCENT: {s}. Using no markup.");
                        None
                    })
            })
            .unwrap_or(0.0);
        let channel_id = env::var("SMM_CHANNEL_ID")
            .ok()
            .and_then(|s| {
                s.trim()
                    .parse::<i64>()
                    .map_err(|e| warn!("🪛️ Invalid configuration value for SMM_CHANNEL_ID. {e}"))
                    .ok()
            })
            .unwrap_or(0);
        let bot_link = env::var("SMM_BOT_LINK").ok().unwrap_or_else(|| DEFAULT_BOT_LINK.into());
        let enable_bots = parse_boolean_flag(env::var("SMM_ENABLE_BOTS").ok(), true);
        if !enable_bots {
            info!("🪛️ Tenant bots are disabled on this instance");
        }
        Self {
            host,
            port,
            database_url,
            markup_percent,
            channel_id,
            bot_link,
            enable_bots,
            orders_api: OrdersApiConfig::new_from_env_or_default(),
            cryptomus: CryptomusConfig::new_from_env_or_default(),
            aaio: AaioConfig::new_from_env_or_default(),
            payok: PayokConfig::new_from_env_or_default(),
            telegram: TelegramConfig::new_from_env_or_default(),
            timers: TimerConfig::from_env_or_default(),
        }
    }
}

impl TimerConfig {
    pub fn from_env_or_default() -> Self {
        Self {
            reconcile_interval: duration_from_env("SMM_RECONCILE_INTERVAL", DEFAULT_RECONCILE_INTERVAL),
            rate_refresh_interval: duration_from_env("SMM_RATE_REFRESH_INTERVAL", DEFAULT_RATE_REFRESH_INTERVAL),
            supervisor_scan_interval: duration_from_env(
                "SMM_SUPERVISOR_SCAN_INTERVAL",
                DEFAULT_SUPERVISOR_SCAN_INTERVAL,
            ),
            worker_lease_ttl: duration_from_env("SMM_WORKER_LEASE_TTL", DEFAULT_WORKER_LEASE_TTL),
        }
    }
}

fn duration_from_env(key: &str, default: Duration) -> Duration {
    match env::var(key) {
        Ok(s) => parse_duration_secs(&s).unwrap_or_else(|| {
            warn!("🪛️ Invalid configuration value for {key}: {s}. Using the default of {}s.", default.as_secs());
            default
        }),
        Err(_) => {
            info!("🪛️ {key} is not set. Using the default value of {}s.", default.as_secs());
            default
        },
    }
}
