//! HTTP clients for the storefront's external collaborators.
//!
//! Each client implements one of the collaborator traits from `smm_engine::traits`, so the engine and server never see
//! a wire format:
//! * [`OrdersApi`] talks to the fulfilment provider (`OrderSource`, `RateSource`).
//! * [`CryptomusClient`], [`AaioLinks`] and [`PayokLinks`] produce checkout URLs (`PaymentLinkProvider`).
//! * [`TelegramTransport`] is the tenant bots' chat transport (`BotTransport`).
mod config;
mod data_objects;
mod error;
mod orders_api;
mod payment_links;
mod rest;
mod telegram;

pub use config::{AaioConfig, CryptomusConfig, OrdersApiConfig, PayokConfig, TelegramConfig};
pub use data_objects::{CreatedOrder, UpstreamOrder};
pub use error::UpstreamError;
pub use orders_api::OrdersApi;
pub use payment_links::{aaio_sign, cryptomus_sign, payok_sign, AaioLinks, CryptomusClient, PayokLinks};
pub use telegram::TelegramTransport;
