//! Checkout link providers.
//!
//! Cryptomus issues links through its API. AAIO and PayOK links are built locally and signed with the shop secret.
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use log::*;
use md5::{Digest, Md5};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use smm_engine::{
    db_types::PaymentProvider,
    traits::{PaymentLinkProvider, PaymentLinkRequest, UpstreamFetchError},
};

use crate::{
    config::{AaioConfig, CryptomusConfig, PayokConfig},
    rest::RestClient,
    UpstreamError,
};

/// `md5(base64(body) + api_key)`, hex encoded
pub fn cryptomus_sign(body: &[u8], api_key: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(STANDARD.encode(body).as_bytes());
    hasher.update(api_key.as_bytes());
    hex::encode(hasher.finalize())
}

/// `sha256("merchant:amount:currency:secret:order_id")`, hex encoded
pub fn aaio_sign(merchant_id: &str, amount: &str, currency: &str, secret: &str, order_id: &str) -> String {
    let data = format!("{merchant_id}:{amount}:{currency}:{secret}:{order_id}");
    hex::encode(Sha256::digest(data.as_bytes()))
}

/// `md5("amount|payment|shop|currency|desc|" + secret)`, hex encoded
pub fn payok_sign(amount: &str, payment: &str, shop: &str, currency: &str, desc: &str, secret: &str) -> String {
    let data = format!("{amount}|{payment}|{shop}|{currency}|{desc}|{secret}");
    hex::encode(Md5::digest(data.as_bytes()))
}

fn build_url(base: &str, params: &[(&str, &str)]) -> Result<String, UpstreamError> {
    let url = Url::parse_with_params(base, params).map_err(|e| UpstreamError::RestRequestError(e.to_string()))?;
    Ok(url.to_string())
}

//--------------------------------------      Cryptomus      ---------------------------------------------------------

// Field order is alphabetical so the serialized body matches what the signature was computed over
#[derive(Debug, Serialize)]
struct CryptomusInvoice<'a> {
    amount: String,
    currency: &'a str,
    order_id: &'a str,
    url_callback: String,
}

#[derive(Debug, Deserialize)]
struct CryptomusResponse {
    result: Option<CryptomusInvoiceResult>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CryptomusInvoiceResult {
    url: String,
}

#[derive(Clone)]
pub struct CryptomusClient {
    config: CryptomusConfig,
    client: RestClient,
}

impl CryptomusClient {
    pub fn new(config: CryptomusConfig) -> Result<Self, UpstreamError> {
        let client = RestClient::new()?;
        Ok(Self { config, client })
    }

    pub async fn create_invoice(&self, request: &PaymentLinkRequest) -> Result<String, UpstreamError> {
        let currency = request.currency.to_string();
        let invoice = CryptomusInvoice {
            amount: format!("{:.4}", request.amount),
            currency: &currency,
            order_id: &request.reference,
            url_callback: format!("{}/webhook", self.config.callback_url.trim_end_matches('/')),
        };
        let body = serde_json::to_vec(&invoice).map_err(|e| UpstreamError::JsonError(e.to_string()))?;
        let sign = cryptomus_sign(&body, self.config.api_key.reveal());
        let req = self
            .client
            .request(reqwest::Method::POST, &self.config.api_url)
            .header("merchant", self.config.merchant.as_str())
            .header("sign", sign)
            .header("Content-Type", "application/json")
            .body(body);
        let response: CryptomusResponse = self.client.json(req).await?;
        match response.result {
            Some(result) => Ok(result.url),
            None => Err(UpstreamError::RestResponseError(
                response.message.unwrap_or_else(|| "Cryptomus returned no payment URL".into()),
            )),
        }
    }
}

#[async_trait]
impl PaymentLinkProvider for CryptomusClient {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Cryptomus
    }

    async fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<String, UpstreamFetchError> {
        let url = self.create_invoice(request).await?;
        debug!("💳️ Cryptomus invoice created for {}", request.reference);
        Ok(url)
    }
}

//--------------------------------------        AAIO         ---------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AaioLinks {
    config: AaioConfig,
}

impl AaioLinks {
    pub fn new(config: AaioConfig) -> Self {
        Self { config }
    }

    pub fn payment_url(&self, request: &PaymentLinkRequest) -> Result<String, UpstreamError> {
        let amount = format!("{:.2}", request.amount);
        let currency = request.currency.to_string();
        let shop = self.config.shop_id.as_str();
        let sign = aaio_sign(shop, &amount, &currency, self.config.secret.reveal(), &request.reference);
        build_url(&self.config.pay_url, &[
            ("amount", amount.as_str()),
            ("currency", currency.as_str()),
            ("desc", request.description.as_str()),
            ("lang", "ru"),
            ("merchant_id", shop),
            ("order_id", request.reference.as_str()),
            ("sign", sign.as_str()),
        ])
    }
}

#[async_trait]
impl PaymentLinkProvider for AaioLinks {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Aaio
    }

    async fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<String, UpstreamFetchError> {
        Ok(self.payment_url(request)?)
    }
}

//--------------------------------------        PayOK        ---------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PayokLinks {
    config: PayokConfig,
}

impl PayokLinks {
    pub fn new(config: PayokConfig) -> Self {
        Self { config }
    }

    pub fn payment_url(&self, request: &PaymentLinkRequest) -> Result<String, UpstreamError> {
        let amount = format!("{:.2}", request.amount);
        let currency = request.currency.to_string();
        let shop = self.config.shop_id.as_str();
        let desc = request.description.as_str();
        let sign = payok_sign(&amount, &request.reference, shop, &currency, desc, self.config.secret.reveal());
        build_url(&self.config.pay_url, &[
            ("amount", amount.as_str()),
            ("currency", currency.as_str()),
            ("desc", desc),
            ("payment", request.reference.as_str()),
            ("shop", shop),
            ("sign", sign.as_str()),
        ])
    }
}

#[async_trait]
impl PaymentLinkProvider for PayokLinks {
    fn provider(&self) -> PaymentProvider {
        PaymentProvider::Payok
    }

    async fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<String, UpstreamFetchError> {
        Ok(self.payment_url(request)?)
    }
}
