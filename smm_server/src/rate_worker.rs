use std::{sync::Arc, time::Duration};

use log::*;
use smm_engine::{db_types::Currency, traits::RateSource, ExchangeRateApi, SqliteDatabase};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

/// Starts the exchange rate worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// A failed refresh keeps the last stored rate. Prices keep working as long as any rate has ever been stored.
pub fn start_rate_worker(db: SqliteDatabase, source: Arc<dyn RateSource>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let api = ExchangeRateApi::new(db);
        info!("💱️ Exchange rate worker started. Refreshing every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            match api.refresh(source.as_ref(), Currency::Rub).await {
                Ok(Some(rate)) => debug!("💱️ {} rate refreshed: {}", rate.currency, rate.rate),
                Ok(None) => {},
                Err(e) => error!("💱️ Could not store the refreshed exchange rate. {e}"),
            }
        }
    })
}
