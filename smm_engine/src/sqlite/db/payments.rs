use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPayment, Payment, PaymentStatus},
    traits::PaymentError,
};

pub async fn insert_payment(payment: NewPayment, conn: &mut SqliteConnection) -> Result<Payment, PaymentError> {
    let result = sqlx::query_as(
        r#"INSERT INTO payments (reference, user_id, amount, url, provider) VALUES ($1, $2, $3, $4, $5)
        RETURNING *"#,
    )
    .bind(&payment.reference)
    .bind(payment.user_id)
    .bind(payment.amount)
    .bind(&payment.url)
    .bind(payment.provider)
    .fetch_one(conn)
    .await;
    match result {
        Ok(p) => Ok(p),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            Err(PaymentError::PaymentAlreadyExists(payment.reference))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_payment(reference: &str, conn: &mut SqliteConnection) -> Result<Option<Payment>, PaymentError> {
    let payment =
        sqlx::query_as("SELECT * FROM payments WHERE reference = $1").bind(reference).fetch_optional(conn).await?;
    Ok(payment)
}

pub async fn set_url(reference: &str, url: &str, conn: &mut SqliteConnection) -> Result<Option<Payment>, PaymentError> {
    let payment = sqlx::query_as(
        r#"UPDATE payments SET url = $1, updated_at = CURRENT_TIMESTAMP
        WHERE reference = $2
        RETURNING *"#,
    )
    .bind(url)
    .bind(reference)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// Moves the payment to `paid`. Returns `None` if the payment does not exist or is already paid.
pub async fn mark_paid(reference: &str, conn: &mut SqliteConnection) -> Result<Option<Payment>, PaymentError> {
    let payment = sqlx::query_as(
        r#"UPDATE payments SET status = 'paid', updated_at = CURRENT_TIMESTAMP
        WHERE reference = $1 AND status <> 'paid'
        RETURNING *"#,
    )
    .bind(reference)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}

/// Sets a non-paid status. Paid payments are left alone, so `None` means "not found or already paid".
pub async fn update_unpaid_status(
    reference: &str,
    status: PaymentStatus,
    conn: &mut SqliteConnection,
) -> Result<Option<Payment>, PaymentError> {
    let payment = sqlx::query_as(
        r#"UPDATE payments SET status = $1, updated_at = CURRENT_TIMESTAMP
        WHERE reference = $2 AND status <> 'paid'
        RETURNING *"#,
    )
    .bind(status)
    .bind(reference)
    .fetch_optional(conn)
    .await?;
    Ok(payment)
}
