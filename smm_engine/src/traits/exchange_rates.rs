use thiserror::Error;

use crate::db_types::{Currency, ExchangeRate};

#[derive(Debug, Clone, Error)]
pub enum ExchangeRateError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The requested exchange rate does not exist: {0}")]
    RateDoesNotExist(Currency),
    #[error("Exchange rates must be positive and finite, but got {0}")]
    InvalidRate(f64),
}

impl From<sqlx::Error> for ExchangeRateError {
    fn from(e: sqlx::Error) -> Self {
        ExchangeRateError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait ExchangeRates {
    /// Fetch the last exchange rate for the given currency. If the rate does not exist, the error
    /// [`ExchangeRateError::RateDoesNotExist`] is returned.
    async fn fetch_last_rate(&self, currency: Currency) -> Result<ExchangeRate, ExchangeRateError>;
    /// Save the exchange rate for the given currency to the backend storage
    async fn set_exchange_rate(&self, rate: &ExchangeRate) -> Result<(), ExchangeRateError>;
}
