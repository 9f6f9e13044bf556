//! # Storefront engine public API
//!
//! The `smm_api` module exposes the programmatic API of the engine. It is modular, so that clients can pick the
//! functionality they need.
//!
//! * [`ledger_api`] credits and debits accounts, and manages referrals.
//! * [`promo_api`] creates and redeems promo codes and special links, and interprets `/start` parameters.
//! * [`reconciler_api`] runs reconciliation passes against the fulfilment provider.
//! * [`payment_api`] creates payment intents and applies provider notifications.
//! * [`purchase_api`] prices and places orders.
//! * [`tenant_api`] registers and stops tenant bots.
//! * [`exchange_rate_api`] stores and refreshes the secondary-currency rate.
//!
//! # API usage
//!
//! An API instance is created by supplying a database backend that implements the backend traits the API needs:
//!
//! ```rust,ignore
//! use smm_engine::{LedgerApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/smm_store.db", 25).await?;
//! let api = LedgerApi::new(db);
//! let note = api.top_up(user_id, Money::from_units(10)).await?;
//! ```
pub mod exchange_rate_api;
pub mod ledger_api;
pub mod payment_api;
pub mod promo_api;
pub mod purchase_api;
pub mod reconciler_api;
pub mod tenant_api;
