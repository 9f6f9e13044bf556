//! The idempotency fence. Every financial side effect inserts its `(operation_kind, external_reference)` key in the
//! same transaction as the mutation it guards. If the insert is a no-op, the effect has already been applied.
use sqlx::SqliteConnection;

use crate::db_types::OperationKind;

/// Returns `true` if the key was inserted (i.e. the operation has not been applied before).
pub async fn try_insert_key(
    kind: OperationKind,
    reference: &str,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"INSERT INTO idempotency_keys (operation_kind, external_reference) VALUES ($1, $2)
        ON CONFLICT (operation_kind, external_reference) DO NOTHING"#,
    )
    .bind(kind)
    .bind(reference)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}
