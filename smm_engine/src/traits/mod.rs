//! # Backend contracts
//!
//! This module defines the behaviour that storage backends must expose to support the engine, plus the contracts of
//! the external collaborators (fulfilment API, rate feed, payment-link providers, bot transport).
//!
//! * [`LedgerManagement`] owns account balances. All credits and debits go through it.
//! * [`PromoManagement`] handles promo code creation and redemption.
//! * [`OrderManagement`] stores orders and reconciles them against upstream status reports.
//! * [`PaymentManagement`] records payment intents and settles them exactly once.
//! * [`TenantManagement`] is the durable registry of tenant bots, including worker leases.
//! * [`ExchangeRates`] stores the secondary-currency exchange rate.
//! * [`CatalogManagement`] provides the service lookups used for pricing.
mod catalog_management;
mod exchange_rates;
mod ledger_management;
mod order_management;
mod payment_management;
mod promo_management;
mod tenant_management;
mod upstream;

pub use catalog_management::{CatalogError, CatalogManagement};
pub use exchange_rates::{ExchangeRateError, ExchangeRates};
pub use ledger_management::{LedgerError, LedgerManagement};
pub use order_management::{OrderError, OrderManagement, ReconcileOutcome};
pub use payment_management::{PaymentError, PaymentManagement, Settlement};
pub use promo_management::{PromoError, PromoManagement};
pub use tenant_management::{TenantError, TenantManagement};
pub use upstream::{
    BotTransport,
    OrderRequest,
    OrderSource,
    PaymentLinkProvider,
    PaymentLinkRequest,
    RateSource,
    TransportError,
    UpstreamFetchError,
};
