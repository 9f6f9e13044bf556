use sqlx::SqliteConnection;

use crate::{
    db_types::{Money, NewOrder, Order, OrderId, OrderStatusReport, RefundMarker},
    traits::OrderError,
};

pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, OrderError> {
    let result = sqlx::query_as(
        r#"INSERT INTO orders (order_id, user_id, service_id, service_type, link, quantity, cost)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *"#,
    )
    .bind(order.order_id)
    .bind(order.user_id)
    .bind(&order.service_id)
    .bind(&order.service_type)
    .bind(&order.link)
    .bind(order.quantity)
    .bind(order.cost)
    .fetch_one(conn)
    .await;
    match result {
        Ok(order) => Ok(order),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(OrderError::OrderAlreadyExists(order.order_id)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_order_by_order_id(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, OrderError> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

/// A no-op write on the order row. Issued first in a reconciliation transaction so that the write lock is taken before
/// anything is read. Returns `false` if the order is not ours.
pub async fn lock_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<bool, OrderError> {
    let result =
        sqlx::query("UPDATE orders SET updated_at = updated_at WHERE order_id = $1").bind(order_id).execute(conn).await?;
    Ok(result.rows_affected() == 1)
}

pub async fn orders_for_account(user_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Order>, OrderError> {
    let orders = sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Overwrites the progress fields with the upstream report.
pub async fn update_progress(report: &OrderStatusReport, conn: &mut SqliteConnection) -> Result<Order, OrderError> {
    let order: Option<Order> = sqlx::query_as(
        r#"UPDATE orders SET status = $1, charge = $2, start_count = $3, remains = $4, updated_at = CURRENT_TIMESTAMP
        WHERE order_id = $5
        RETURNING *"#,
    )
    .bind(report.status)
    .bind(report.charge)
    .bind(report.start_count)
    .bind(report.remains)
    .bind(report.order_id)
    .fetch_optional(conn)
    .await?;
    order.ok_or(OrderError::OrderNotFound(report.order_id))
}

pub async fn insert_refund_marker(
    order_id: OrderId,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<RefundMarker, OrderError> {
    let marker = sqlx::query_as("INSERT INTO refunded_orders (order_id, amount) VALUES ($1, $2) RETURNING *")
        .bind(order_id)
        .bind(amount)
        .fetch_one(conn)
        .await?;
    Ok(marker)
}

pub async fn fetch_refund_marker(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<RefundMarker>, OrderError> {
    let marker = sqlx::query_as("SELECT * FROM refunded_orders WHERE order_id = $1")
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(marker)
}
