use async_trait::async_trait;
use log::*;
use reqwest::Method;
use smm_engine::{
    db_types::{Currency, OrderId, OrderStatusReport},
    traits::{OrderRequest, OrderSource, RateSource, UpstreamFetchError},
};

use crate::{
    config::OrdersApiConfig,
    data_objects::{CreateOrderBody, CreatedOrder, UpstreamOrder},
    rest::RestClient,
    UpstreamError,
};

/// Client for the fulfilment provider's order and rate endpoints. Requests carry the account token in the
/// `Authorization` header.
#[derive(Clone)]
pub struct OrdersApi {
    config: OrdersApiConfig,
    client: RestClient,
}

impl OrdersApi {
    pub fn new(config: OrdersApiConfig) -> Result<Self, UpstreamError> {
        let client = RestClient::new()?;
        Ok(Self { config, client })
    }

    fn authorized(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.client.request(method, url).header("Authorization", self.config.token.reveal().as_str())
    }

    pub async fn fetch_orders(&self) -> Result<Vec<UpstreamOrder>, UpstreamError> {
        let req = self.authorized(Method::GET, &self.config.orders_endpoint);
        let orders: Vec<UpstreamOrder> = self.client.json(req).await?;
        debug!("🔄️ Fetched {} orders from the fulfilment provider", orders.len());
        Ok(orders)
    }

    pub async fn submit_order(&self, request: &OrderRequest) -> Result<CreatedOrder, UpstreamError> {
        let body = CreateOrderBody { service_id: &request.service_id, link: &request.link, quantity: request.quantity };
        let req = self.authorized(Method::POST, &self.config.orders_endpoint).json(&body);
        let order: CreatedOrder = self.client.json(req).await?;
        info!("🛒️ Fulfilment provider accepted order {} for service {}", order.id, request.service_id);
        Ok(order)
    }

    /// The rate endpoint answers with a bare number in the body.
    pub async fn current_rate(&self) -> Result<f64, UpstreamError> {
        let req = self.authorized(Method::GET, &self.config.rates_endpoint);
        let body = self.client.text(req).await?;
        let rate = body
            .trim()
            .parse::<f64>()
            .map_err(|e| UpstreamError::InvalidCurrencyAmount(format!("'{}' is not a rate. {e}", body.trim())))?;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(UpstreamError::InvalidCurrencyAmount(format!("{rate} is not a usable rate")));
        }
        Ok(rate)
    }
}

#[async_trait]
impl OrderSource for OrdersApi {
    async fn fetch_order_details(&self) -> Result<Vec<OrderStatusReport>, UpstreamFetchError> {
        let orders = self.fetch_orders().await?;
        let mut reports = Vec::with_capacity(orders.len());
        for order in orders {
            match OrderStatusReport::try_from(order) {
                Ok(report) => reports.push(report),
                Err(e) => warn!("🔄️ Skipping an upstream order that could not be read. {e}"),
            }
        }
        Ok(reports)
    }

    async fn create_order(&self, request: &OrderRequest) -> Result<OrderId, UpstreamFetchError> {
        let order = self.submit_order(request).await?;
        Ok(OrderId(order.id))
    }
}

#[async_trait]
impl RateSource for OrdersApi {
    async fn fetch_rate(&self, currency: Currency) -> Result<f64, UpstreamFetchError> {
        match currency {
            Currency::Usd => Ok(1.0),
            Currency::Rub => Ok(self.current_rate().await?),
        }
    }
}
