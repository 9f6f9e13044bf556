//! The ExchangeRateApi stores and refreshes the rate between the base currency and the secondary currency.

use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Currency, ExchangeRate},
    traits::{ExchangeRateError, ExchangeRates, RateSource},
};

pub struct ExchangeRateApi<B> {
    db: B,
}

impl<B> Debug for ExchangeRateApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ExchangeRateApi")
    }
}

impl<B> ExchangeRateApi<B>
where B: ExchangeRates
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn fetch_last_rate(&self, currency: Currency) -> Result<ExchangeRate, ExchangeRateError> {
        self.db.fetch_last_rate(currency).await
    }

    pub async fn set_exchange_rate(&self, rate: &ExchangeRate) -> Result<(), ExchangeRateError> {
        self.db.set_exchange_rate(rate).await?;
        info!("💱️ Exchange rate for {} set to {}", rate.currency, rate.rate);
        Ok(())
    }

    /// Pulls the current rate from `source` and stores it. On failure, the last stored rate stays in effect.
    /// Returns the new rate, or `None` if the source could not be read.
    pub async fn refresh(
        &self,
        source: &dyn RateSource,
        currency: Currency,
    ) -> Result<Option<ExchangeRate>, ExchangeRateError> {
        let rate = match source.fetch_rate(currency).await {
            Ok(rate) => rate,
            Err(e) => {
                warn!("💱️ Could not fetch the {currency} exchange rate. Keeping the last known rate. {e}");
                return Ok(None);
            },
        };
        let rate = ExchangeRate::new(currency, rate);
        self.set_exchange_rate(&rate).await?;
        Ok(Some(rate))
    }
}
