//! SMM storefront engine
//!
//! The engine holds the money-moving core of the storefront: the balance ledger, promo code and referral logic, order
//! reconciliation against the fulfilment provider, payment settlement, and the registry of tenant bots.
//! It is transport-agnostic. HTTP servers, bot front-ends and upstream API clients live in other crates and talk to the
//! engine through the APIs in [`mod@smm_api`].
//!
//! The library is divided into these sections:
//! 1. Database management ([`mod@traits`] and the SQLite backend). You should never need to access the database
//!    directly. Backends implement the traits in [`mod@traits`]; the data types they exchange are in [`mod@db_types`].
//! 2. The public API ([`mod@smm_api`]). Each API is generic over a backend, so that tests can swap in mocks.
//! 3. Events ([`mod@events`]). Hooks fire after financial side effects have been committed.
//!
//! Every financial side effect (payment credit, order refund, promo redemption) is guarded by an idempotency key that is
//! inserted in the same transaction as the balance mutation. Replaying an event is always safe.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod traits;

mod smm_api;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use smm_api::{
    exchange_rate_api::ExchangeRateApi,
    ledger_api::LedgerApi,
    payment_api::{NotificationOutcome, PaymentFlowApi, PaymentRequest},
    promo_api::{PromoApi, StartAction},
    purchase_api::{PurchaseApi, PurchaseError, Quote},
    reconciler_api::{OrderReconcilerApi, ReconcileError, ReconcileReport},
    tenant_api::{TenantApi, MAX_TENANTS_PER_OWNER},
};
