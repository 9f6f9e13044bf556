use std::sync::{
    atomic::{AtomicI64, Ordering},
    Mutex,
};

use async_trait::async_trait;
use smm_engine::{
    db_types::{Currency, OrderId, OrderStatusReport, PaymentProvider},
    traits::{OrderRequest, OrderSource, PaymentLinkProvider, PaymentLinkRequest, RateSource, UpstreamFetchError},
};

/// An in-memory fulfilment provider. Reports are served as-is; new orders get sequential ids.
#[derive(Default)]
pub struct FakeUpstream {
    pub reports: Mutex<Vec<OrderStatusReport>>,
    pub offline: Mutex<bool>,
    pub reject_orders: Mutex<bool>,
    pub next_id: AtomicI64,
    pub rate: Mutex<Option<f64>>,
}

impl FakeUpstream {
    pub fn with_reports(reports: Vec<OrderStatusReport>) -> Self {
        Self { reports: Mutex::new(reports), next_id: AtomicI64::new(1000), ..Default::default() }
    }

    pub fn set_reports(&self, reports: Vec<OrderStatusReport>) {
        *self.reports.lock().unwrap() = reports;
    }

    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }
}

#[async_trait]
impl OrderSource for FakeUpstream {
    async fn fetch_order_details(&self) -> Result<Vec<OrderStatusReport>, UpstreamFetchError> {
        if *self.offline.lock().unwrap() {
            return Err(UpstreamFetchError::Unreachable("connection refused".into()));
        }
        Ok(self.reports.lock().unwrap().clone())
    }

    async fn create_order(&self, _request: &OrderRequest) -> Result<OrderId, UpstreamFetchError> {
        if *self.reject_orders.lock().unwrap() {
            return Err(UpstreamFetchError::Rejected("service is disabled".into()));
        }
        Ok(OrderId(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }
}

#[async_trait]
impl RateSource for FakeUpstream {
    async fn fetch_rate(&self, _currency: Currency) -> Result<f64, UpstreamFetchError> {
        self.rate.lock().unwrap().ok_or_else(|| UpstreamFetchError::Unreachable("rate feed is down".into()))
    }
}

/// A payment provider that hands out predictable checkout URLs.
pub struct FakeCheckout {
    pub provider: PaymentProvider,
    pub fail: bool,
}

#[async_trait]
impl PaymentLinkProvider for FakeCheckout {
    fn provider(&self) -> PaymentProvider {
        self.provider
    }

    async fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<String, UpstreamFetchError> {
        if self.fail {
            return Err(UpstreamFetchError::Rejected("merchant is disabled".into()));
        }
        Ok(format!("https://pay.example.com/{}?amount={}", request.reference, request.amount))
    }
}
