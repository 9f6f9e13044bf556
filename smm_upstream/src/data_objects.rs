use serde::{Deserialize, Serialize};
use smm_engine::db_types::{Money, OrderId, OrderStatusReport, OrderStatusType};

use crate::UpstreamError;

/// An order as listed by the fulfilment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamOrder {
    pub id: i64,
    #[serde(default)]
    pub service_id: i64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub service_type: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub charge: f64,
    #[serde(default)]
    pub start_count: i64,
    #[serde(default)]
    pub remains: i64,
}

impl TryFrom<UpstreamOrder> for OrderStatusReport {
    type Error = UpstreamError;

    fn try_from(order: UpstreamOrder) -> Result<Self, Self::Error> {
        let charge = Money::try_from(order.charge)
            .map_err(|e| UpstreamError::InvalidCurrencyAmount(format!("order {}: {e}", order.id)))?;
        Ok(OrderStatusReport {
            order_id: OrderId(order.id),
            status: OrderStatusType::normalize(&order.status),
            charge,
            start_count: order.start_count,
            remains: order.remains,
        })
    }
}

/// The provider's answer to a new order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedOrder {
    pub id: i64,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateOrderBody<'a> {
    pub service_id: &'a str,
    pub link: &'a str,
    pub quantity: i64,
}
