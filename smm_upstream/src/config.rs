use log::*;
use smm_common::Secret;

const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
const DEFAULT_CRYPTOMUS_API_URL: &str = "https://api.cryptomus.com/v1/payment";
const DEFAULT_AAIO_PAY_URL: &str = "https://aaio.so/merchant/pay";
const DEFAULT_PAYOK_PAY_URL: &str = "https://payok.io/pay";

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| {
        warn!("🪛️ {key} not set, using (probably useless) default");
        default.to_string()
    })
}

fn secret_env(key: &str) -> Secret<String> {
    Secret::new(std::env::var(key).unwrap_or_else(|_| {
        warn!("🪛️ {key} not set. Requests that need it will be rejected");
        String::default()
    }))
}

/// The fulfilment provider. Orders and the exchange rate come from the same account.
#[derive(Debug, Clone, Default)]
pub struct OrdersApiConfig {
    pub orders_endpoint: String,
    pub rates_endpoint: String,
    pub token: Secret<String>,
}

impl OrdersApiConfig {
    pub fn new_from_env_or_default() -> Self {
        let orders_endpoint = env_or("SMM_ORDERS_ENDPOINT", "https://api.stagesmm.com/orders");
        let rates_endpoint = env_or("SMM_RATES_ENDPOINT", "https://api.stagesmm.com/rates");
        let token = secret_env("SMM_ORDERS_TOKEN");
        Self { orders_endpoint, rates_endpoint, token }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CryptomusConfig {
    pub api_url: String,
    pub merchant: String,
    pub api_key: Secret<String>,
    /// Our public base URL. Cryptomus posts notifications to `<callback_url>/webhook`.
    pub callback_url: String,
}

impl CryptomusConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("SMM_CRYPTOMUS_API_URL").unwrap_or_else(|_| DEFAULT_CRYPTOMUS_API_URL.into());
        let merchant = env_or("SMM_CRYPTOMUS_MERCHANT", "");
        let api_key = secret_env("SMM_CRYPTOMUS_API_KEY");
        let callback_url = env_or("SMM_CALLBACK_URL", "http://localhost:8080");
        Self { api_url, merchant, api_key, callback_url }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AaioConfig {
    pub pay_url: String,
    pub shop_id: String,
    pub secret: Secret<String>,
}

impl AaioConfig {
    pub fn new_from_env_or_default() -> Self {
        let pay_url = std::env::var("SMM_AAIO_PAY_URL").unwrap_or_else(|_| DEFAULT_AAIO_PAY_URL.into());
        let shop_id = env_or("SMM_AAIO_SHOP_ID", "");
        let secret = secret_env("SMM_AAIO_SECRET");
        Self { pay_url, shop_id, secret }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PayokConfig {
    pub pay_url: String,
    pub shop_id: String,
    pub secret: Secret<String>,
}

impl PayokConfig {
    pub fn new_from_env_or_default() -> Self {
        let pay_url = std::env::var("SMM_PAYOK_PAY_URL").unwrap_or_else(|_| DEFAULT_PAYOK_PAY_URL.into());
        let shop_id = env_or("SMM_PAYOK_SHOP_ID", "");
        let secret = secret_env("SMM_PAYOK_SECRET");
        Self { pay_url, shop_id, secret }
    }
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_url: String,
    /// Long-poll timeout for `getUpdates`, in seconds
    pub poll_timeout: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self { api_url: DEFAULT_TELEGRAM_API_URL.to_string(), poll_timeout: 30 }
    }
}

impl TelegramConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("SMM_TELEGRAM_API_URL").unwrap_or_else(|_| DEFAULT_TELEGRAM_API_URL.into());
        Self { api_url, ..Default::default() }
    }
}
