use thiserror::Error;

use crate::{
    db_types::{CreditNote, Currency, NewPayment, Payment, PaymentStatus},
    traits::LedgerError,
};

#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The requested payment {0} does not exist")]
    PaymentNotFound(String),
    #[error("Payment {0} already exists")]
    PaymentAlreadyExists(String),
    #[error("Payment amounts must be positive")]
    InvalidAmount,
    #[error("No exchange rate is available for {0}")]
    ExchangeRateUnavailable(Currency),
    #[error("Could not create a payment link. {0}")]
    ProviderError(String),
    #[error("{0}")]
    LedgerError(#[from] LedgerError),
}

impl From<sqlx::Error> for PaymentError {
    fn from(e: sqlx::Error) -> Self {
        PaymentError::DatabaseError(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement {
    /// The payment was marked paid and its amount credited in this call.
    Settled { payment: Payment, note: CreditNote },
    /// The payment had already been settled. Nothing was credited.
    AlreadySettled(Payment),
}

#[allow(async_fn_in_trait)]
pub trait PaymentManagement {
    /// Stores a new `pending` payment intent. The owning account is created if necessary.
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PaymentError>;

    async fn fetch_payment(&self, reference: &str) -> Result<Option<Payment>, PaymentError>;

    /// Records the provider's checkout URL for a stored payment.
    async fn set_payment_url(&self, reference: &str, url: &str) -> Result<Payment, PaymentError>;

    /// Settles the payment with the given reference exactly once.
    ///
    /// In one transaction, the `payment_credit` idempotency key is inserted, the payment is marked `paid`, and the amount
    /// is credited to the account as a top-up. If the key already exists, or the payment is already `paid`,
    /// [`Settlement::AlreadySettled`] is returned and nothing changes.
    async fn settle_payment(&self, reference: &str) -> Result<Settlement, PaymentError>;

    /// Records a non-paid status (`check`, `cancel`, `fail`). Paid payments are never moved out of `paid`; in that case
    /// the payment is returned unchanged.
    async fn update_payment_status(&self, reference: &str, status: PaymentStatus) -> Result<Payment, PaymentError>;
}
