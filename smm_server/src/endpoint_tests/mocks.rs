use async_trait::async_trait;
use mockall::mock;
use smm_engine::{
    db_types::{Currency, ExchangeRate, NewPayment, Payment, PaymentProvider, PaymentStatus},
    traits::{
        ExchangeRateError,
        ExchangeRates,
        PaymentError,
        PaymentLinkProvider,
        PaymentLinkRequest,
        PaymentManagement,
        Settlement,
        UpstreamFetchError,
    },
};

mock! {
    pub PaymentBackend {}
    impl PaymentManagement for PaymentBackend {
        async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PaymentError>;
        async fn set_payment_url(&self, reference: &str, url: &str) -> Result<Payment, PaymentError>;
        async fn fetch_payment(&self, reference: &str) -> Result<Option<Payment>, PaymentError>;
        async fn settle_payment(&self, reference: &str) -> Result<Settlement, PaymentError>;
        async fn update_payment_status(&self, reference: &str, status: PaymentStatus) -> Result<Payment, PaymentError>;
    }
    impl ExchangeRates for PaymentBackend {
        async fn fetch_last_rate(&self, currency: Currency) -> Result<ExchangeRate, ExchangeRateError>;
        async fn set_exchange_rate(&self, rate: &ExchangeRate) -> Result<(), ExchangeRateError>;
    }
}

/// A checkout provider that hands out `https://pay.example/{reference}`, or refuses every request.
pub struct StaticLinks {
    pub kind: PaymentProvider,
    pub online: bool,
}

#[async_trait]
impl PaymentLinkProvider for StaticLinks {
    fn provider(&self) -> PaymentProvider {
        self.kind
    }

    async fn create_payment_link(&self, request: &PaymentLinkRequest) -> Result<String, UpstreamFetchError> {
        if self.online {
            Ok(format!("https://pay.example/{}", request.reference))
        } else {
            Err(UpstreamFetchError::Rejected("merchant disabled".into()))
        }
    }
}
