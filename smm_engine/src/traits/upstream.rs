//! Contracts for the external collaborators the engine depends on. HTTP implementations live in `smm_upstream`.
//!
//! These traits use `async_trait` so that the futures are `Send` and the collaborators can be shared across spawned
//! tasks as trait objects.
use async_trait::async_trait;
use serde::Serialize;
use smm_common::Secret;
use thiserror::Error;

use crate::db_types::{BotIdentity, Currency, InboundUpdate, OrderId, OrderStatusReport, PaymentProvider};

#[derive(Debug, Clone, Error)]
pub enum UpstreamFetchError {
    #[error("The upstream service could not be reached. {0}")]
    Unreachable(String),
    #[error("The upstream service returned an unexpected response. {0}")]
    InvalidResponse(String),
    #[error("The upstream service rejected the request. {0}")]
    Rejected(String),
}

#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("The bot token is invalid. {0}")]
    InvalidToken(String),
    #[error("The bot transport is unavailable. {0}")]
    Unavailable(String),
}

/// A new order to submit to the fulfilment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRequest {
    pub service_id: String,
    pub link: String,
    pub quantity: i64,
}

/// The upstream fulfilment API.
#[async_trait]
pub trait OrderSource: Send + Sync {
    /// Fetches the current state of all orders known to the provider, in one batch.
    async fn fetch_order_details(&self) -> Result<Vec<OrderStatusReport>, UpstreamFetchError>;

    /// Submits a new order and returns the id assigned by the provider.
    async fn create_order(&self, request: &OrderRequest) -> Result<OrderId, UpstreamFetchError>;
}

/// A feed for the secondary-currency exchange rate.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Units of `currency` per unit of base currency.
    async fn fetch_rate(&self, currency: Currency) -> Result<f64, UpstreamFetchError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentLinkRequest {
    pub reference: String,
    /// Amount in `currency`, as the customer entered it
    pub amount: f64,
    pub currency: Currency,
    pub description: String,
}

/// A payment provider that can produce a checkout URL for a payment reference.
#[async_trait]
pub trait PaymentLinkProvider: Send + Sync {
    fn provider(&self) -> PaymentProvider;

    async fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<String, UpstreamFetchError>;
}

/// The chat transport used by tenant bots.
#[async_trait]
pub trait BotTransport: Send + Sync {
    /// Checks the token with the transport and returns the bot's identity.
    async fn validate(&self, token: &Secret<String>) -> Result<BotIdentity, TransportError>;

    /// Long-polls for updates with an id of at least `offset`.
    async fn next_updates(&self, token: &Secret<String>, offset: i64) -> Result<Vec<InboundUpdate>, TransportError>;

    async fn send_message(&self, token: &Secret<String>, chat_id: i64, text: &str) -> Result<(), TransportError>;

    /// Whether `user_id` administers (or created) `chat_id`, as seen by the bot that owns `token`.
    async fn is_chat_admin(&self, token: &Secret<String>, chat_id: i64, user_id: i64) -> Result<bool, TransportError>;
}
