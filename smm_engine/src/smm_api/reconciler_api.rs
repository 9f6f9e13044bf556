use std::fmt::{Debug, Display};

use log::*;
use thiserror::Error;

use crate::{
    db_types::{Money, Order, OrderStatusReport},
    events::{EventProducers, OrderRefundedEvent},
    traits::{OrderManagement, OrderSource, ReconcileOutcome, UpstreamFetchError},
};

#[derive(Debug, Clone, Error)]
pub enum ReconcileError {
    #[error("Could not fetch order details. {0}")]
    UpstreamFetchError(#[from] UpstreamFetchError),
}

/// A summary of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub fetched: usize,
    pub unchanged: usize,
    pub updated: usize,
    pub refunded: usize,
    pub refunded_amount: Money,
    pub already_refunded: usize,
    pub unknown: usize,
    pub failed: usize,
}

impl Display for ReconcileReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} fetched, {} updated, {} refunded ({}), {} already refunded, {} unchanged, {} unknown, {} failed",
            self.fetched,
            self.updated,
            self.refunded,
            self.refunded_amount,
            self.already_refunded,
            self.unchanged,
            self.unknown,
            self.failed
        )
    }
}

/// `OrderReconcilerApi` keeps local orders in step with the fulfilment provider, and refunds cancelled and partial
/// orders exactly once.
///
/// Each order is reconciled in its own transaction. A failure on one order is logged and counted, and the pass carries
/// on with the next one.
pub struct OrderReconcilerApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderReconcilerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderReconcilerApi")
    }
}

impl<B> OrderReconcilerApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> OrderReconcilerApi<B>
where B: OrderManagement
{
    /// Fetches every order from `source` and reconciles them. If the fetch fails, nothing is reconciled and the error
    /// is returned so that the caller can back off.
    pub async fn run_pass(&self, source: &dyn OrderSource) -> Result<ReconcileReport, ReconcileError> {
        let reports = source.fetch_order_details().await?;
        trace!("🔄️ Fetched {} order reports from upstream", reports.len());
        Ok(self.reconcile(&reports).await)
    }

    pub async fn reconcile(&self, reports: &[OrderStatusReport]) -> ReconcileReport {
        let mut summary = ReconcileReport { fetched: reports.len(), ..Default::default() };
        for report in reports {
            match self.db.reconcile_order(report).await {
                Ok(ReconcileOutcome::UnknownOrder(id)) => {
                    trace!("🔄️ Order {id} is not one of ours. Skipping");
                    summary.unknown += 1;
                },
                Ok(ReconcileOutcome::Unchanged(_)) => summary.unchanged += 1,
                Ok(ReconcileOutcome::Updated(order)) => {
                    debug!("🔄️ Order {} is now {}", order.order_id, order.status);
                    summary.updated += 1;
                },
                Ok(ReconcileOutcome::AlreadyRefunded(order)) => {
                    trace!("🔄️ Order {} has already been refunded", order.order_id);
                    summary.already_refunded += 1;
                },
                Ok(ReconcileOutcome::Refunded { order, amount, .. }) => {
                    info!("🔄️ Order {} is {}. Refunded {amount} to account {}", order.order_id, order.status, order.user_id);
                    summary.refunded += 1;
                    summary.refunded_amount += amount;
                    self.call_order_refunded_hook(order, amount).await;
                },
                Err(e) => {
                    error!("🔄️ Could not reconcile order {}. It will be retried next pass. {e}", report.order_id);
                    summary.failed += 1;
                },
            }
        }
        summary
    }

    async fn call_order_refunded_hook(&self, order: Order, amount: Money) {
        for emitter in &self.producers.order_refunded_producer {
            debug!("🔄️ Notifying order refunded hook subscribers");
            emitter.publish_event(OrderRefundedEvent { order: order.clone(), amount }).await;
        }
    }
}
