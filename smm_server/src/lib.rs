//! # SMM storefront server
//!
//! This crate hosts everything that runs in the storefront process:
//! * The payment webhook gateway. Providers post notifications here, and the bot front end asks for payment links.
//! * The order reconciler and exchange-rate workers, which run on timers.
//! * The tenant supervisor, which keeps exactly one bot worker alive for every running tenant.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/webhook`: Cryptomus payment notifications (JSON).
//! * `/aaio_notification`, `/payok_notification`: AAIO and PayOK payment notifications (form-encoded).
//! * `/create_payment`, `/create_payment_aaio`, `/create_payment_payok`: create a payment link for a top-up.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod notifications;
pub mod rate_worker;
pub mod reconcile_worker;
pub mod routes;
pub mod server;
pub mod supervisor;

#[cfg(test)]
mod endpoint_tests;
