use std::{sync::Arc, time::Duration};

use backon::{ExponentialBuilder, Retryable};
use log::*;
use smm_engine::{events::EventProducers, traits::OrderSource, OrderReconcilerApi, ReconcileError, SqliteDatabase};
use tokio::{task::JoinHandle, time::MissedTickBehavior};

pub const MIN_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Retry schedule for a failed upstream fetch: exponential from 30 s, capped at the reconcile interval, with jitter.
/// There is no attempt limit. The next successful fetch ends the retries and the normal schedule resumes.
pub fn reconcile_backoff(interval: Duration) -> ExponentialBuilder {
    ExponentialBuilder::default()
        .with_min_delay(MIN_RETRY_DELAY)
        .with_max_delay(interval.max(MIN_RETRY_DELAY))
        .without_max_times()
        .with_jitter()
}

/// Starts the order reconciliation worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_reconcile_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    source: Arc<dyn OrderSource>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let api = OrderReconcilerApi::new(db, producers);
        info!("🔄️ Order reconciliation worker started. Running every {}s", interval.as_secs());
        loop {
            timer.tick().await;
            debug!("🔄️ Running order reconciliation pass");
            match run_pass_with_retries(&api, source.as_ref(), interval).await {
                Ok(report) => info!("🔄️ Reconciliation pass complete. {report}"),
                Err(e) => error!("🔄️ Reconciliation pass abandoned. {e}"),
            }
        }
    })
}

async fn run_pass_with_retries(
    api: &OrderReconcilerApi<SqliteDatabase>,
    source: &dyn OrderSource,
    interval: Duration,
) -> Result<smm_engine::ReconcileReport, ReconcileError> {
    (move || async move { api.run_pass(source).await })
        .retry(reconcile_backoff(interval))
        .notify(|e: &ReconcileError, delay: Duration| {
            warn!("🔄️ Could not fetch upstream orders. Retrying in {}s. {e}", delay.as_secs());
        })
        .await
}
