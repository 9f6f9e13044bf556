use std::fmt::Debug;

use log::*;
use thiserror::Error;

use crate::{
    db_types::{CreditKind, Currency, Money, NewOrder, Order, Service},
    helpers::{is_valid_link, order_cost, PriceError},
    traits::{
        CatalogError,
        CatalogManagement,
        ExchangeRateError,
        ExchangeRates,
        LedgerError,
        LedgerManagement,
        OrderError,
        OrderManagement,
        OrderRequest,
        OrderSource,
        UpstreamFetchError,
    },
};

#[derive(Debug, Clone, Error)]
pub enum PurchaseError {
    #[error("{0}")]
    CatalogError(#[from] CatalogError),
    #[error("Service {0} is not in the catalog")]
    ServiceNotFound(String),
    #[error("{0}")]
    PriceError(#[from] PriceError),
    #[error("The link {0} is not a valid URL")]
    InvalidLink(String),
    #[error("{0}")]
    LedgerError(#[from] LedgerError),
    #[error("{0}")]
    OrderError(#[from] OrderError),
    #[error("The fulfilment provider did not accept the order. {0}")]
    UpstreamError(#[from] UpstreamFetchError),
    #[error("{0}")]
    ExchangeRateError(#[from] ExchangeRateError),
}

/// A priced purchase, ready to be confirmed by the customer.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub service: Service,
    pub quantity: i64,
    /// Cost in base currency. This is what gets debited.
    pub cost: Money,
    /// The currency the customer sees prices in
    pub currency: Currency,
    /// `cost` expressed in `currency`
    pub display_price: f64,
}

/// `PurchaseApi` prices services and places orders with the fulfilment provider.
///
/// Placing an order debits the account first. If the provider then rejects the order, the debit is returned as a
/// refund credit, so the customer's balance is never left short.
pub struct PurchaseApi<B> {
    db: B,
    markup_percent: f64,
}

impl<B> Debug for PurchaseApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PurchaseApi ({}% markup)", self.markup_percent)
    }
}

impl<B> PurchaseApi<B> {
    pub fn new(db: B, markup_percent: f64) -> Self {
        Self { db, markup_percent }
    }
}

impl<B> PurchaseApi<B>
where B: CatalogManagement + LedgerManagement + OrderManagement + ExchangeRates
{
    pub async fn quote(&self, service_id: &str, quantity: i64, currency: Currency) -> Result<Quote, PurchaseError> {
        let service = self
            .db
            .fetch_service(service_id)
            .await?
            .ok_or_else(|| PurchaseError::ServiceNotFound(service_id.to_string()))?;
        let cost = order_cost(&service, quantity, self.markup_percent)?;
        let display_price = match currency {
            Currency::Usd => cost.to_f64(),
            c => {
                let rate = self.db.fetch_last_rate(c).await?;
                cost.convert_at(rate.rate).to_f64()
            },
        };
        Ok(Quote { service, quantity, cost, currency, display_price })
    }

    /// Debits `quote.cost` from the account, submits the order upstream, and stores it as `PENDING`.
    pub async fn place_order(
        &self,
        source: &dyn OrderSource,
        user_id: i64,
        quote: &Quote,
        link: &str,
    ) -> Result<Order, PurchaseError> {
        if !is_valid_link(link) {
            return Err(PurchaseError::InvalidLink(link.to_string()));
        }
        self.db.debit(user_id, quote.cost).await?;
        let request =
            OrderRequest { service_id: quote.service.service_id.clone(), link: link.to_string(), quantity: quote.quantity };
        let order_id = match source.create_order(&request).await {
            Ok(id) => id,
            Err(e) => {
                warn!("🛒️ Order for account {user_id} was rejected upstream. Returning {} to the balance. {e}", quote.cost);
                self.db.credit(user_id, quote.cost, CreditKind::Refund).await?;
                return Err(e.into());
            },
        };
        let order = NewOrder {
            order_id,
            user_id,
            service_id: quote.service.service_id.clone(),
            service_type: quote.service.service_type.clone(),
            link: link.to_string(),
            quantity: quote.quantity,
            cost: quote.cost,
        };
        let order = self.db.insert_order(order).await?;
        info!("🛒️ Order {} placed for account {user_id}. {} debited", order.order_id, order.cost);
        Ok(order)
    }
}
