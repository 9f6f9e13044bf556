use thiserror::Error;

use crate::{
    db_types::{CreditNote, Money, NewOrder, Order, OrderId, OrderStatusReport, RefundMarker},
    traits::LedgerError,
};

#[derive(Debug, Clone, Error)]
pub enum OrderError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {0} already exists")]
    OrderAlreadyExists(OrderId),
    #[error("{0}")]
    LedgerError(#[from] LedgerError),
}

impl From<sqlx::Error> for OrderError {
    fn from(e: sqlx::Error) -> Self {
        OrderError::DatabaseError(e.to_string())
    }
}

/// What happened to a single order during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The upstream order has no local counterpart. Reconciliation never creates orders.
    UnknownOrder(OrderId),
    /// Nothing changed.
    Unchanged(Order),
    /// The progress fields were updated. No refund was due.
    Updated(Order),
    /// The order was refunded in this pass.
    Refunded { order: Order, amount: Money, note: CreditNote },
    /// The order is refundable, but a refund has already been applied.
    AlreadyRefunded(Order),
}

#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Stores a new order with `PENDING` status. Fails with [`OrderError::OrderAlreadyExists`] if the upstream order id
    /// has been stored before.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderError>;

    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderError>;

    async fn orders_for_account(&self, user_id: i64) -> Result<Vec<Order>, OrderError>;

    /// Applies an upstream status report to the matching local order, in its own transaction.
    ///
    /// * The progress fields (`status`, `charge`, `start_count`, `remains`) are updated if they differ.
    /// * If the order is `CANCELED` or `PARTIAL`, the refund is credited to the owning account, guarded by the
    ///   `order_refund` idempotency key. A [`RefundMarker`] is written alongside.
    ///
    /// Running this twice for the same report credits the refund once.
    async fn reconcile_order(&self, report: &OrderStatusReport) -> Result<ReconcileOutcome, OrderError>;

    async fn fetch_refund_marker(&self, order_id: OrderId) -> Result<Option<RefundMarker>, OrderError>;
}
