use sqlx::SqliteConnection;

use crate::{
    db_types::{NewTenant, Tenant, TenantId},
    traits::TenantError,
};

pub async fn insert_tenant(tenant: NewTenant, conn: &mut SqliteConnection) -> Result<Tenant, TenantError> {
    let tenant = sqlx::query_as(
        r#"INSERT INTO tenants (owner_id, owner_name, token, bot_name) VALUES ($1, $2, $3, $4)
        RETURNING *"#,
    )
    .bind(tenant.owner_id)
    .bind(&tenant.owner_name)
    .bind(tenant.token.reveal())
    .bind(&tenant.bot_name)
    .fetch_one(conn)
    .await?;
    Ok(tenant)
}

pub async fn count_for_owner(owner_id: i64, conn: &mut SqliteConnection) -> Result<i64, TenantError> {
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM tenants WHERE owner_id = $1")
        .bind(owner_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

pub async fn fetch_tenant(id: TenantId, conn: &mut SqliteConnection) -> Result<Option<Tenant>, TenantError> {
    let tenant = sqlx::query_as("SELECT * FROM tenants WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(tenant)
}

pub async fn tenants_for_owner(owner_id: i64, conn: &mut SqliteConnection) -> Result<Vec<Tenant>, TenantError> {
    let tenants = sqlx::query_as("SELECT * FROM tenants WHERE owner_id = $1 ORDER BY id")
        .bind(owner_id)
        .fetch_all(conn)
        .await?;
    Ok(tenants)
}

pub async fn running_tenant_ids(conn: &mut SqliteConnection) -> Result<Vec<TenantId>, TenantError> {
    let ids = sqlx::query_scalar("SELECT id FROM tenants WHERE running = TRUE ORDER BY id").fetch_all(conn).await?;
    Ok(ids)
}

pub async fn set_running(id: TenantId, running: bool, conn: &mut SqliteConnection) -> Result<(), TenantError> {
    let result = sqlx::query("UPDATE tenants SET running = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(running)
        .bind(id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(TenantError::TenantNotFound(id));
    }
    Ok(())
}

/// Takes the lease if it is free, expired or already ours, and the tenant is still meant to be running.
/// Times are unix milliseconds.
pub async fn try_acquire_lease(
    id: TenantId,
    owner: &str,
    now: i64,
    expires_at: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, TenantError> {
    let result = sqlx::query(
        r#"UPDATE tenants SET lease_owner = $1, lease_expires_at = $2
        WHERE id = $3 AND running = TRUE
          AND (lease_owner IS NULL OR lease_owner = $1 OR lease_expires_at IS NULL OR lease_expires_at <= $4)"#,
    )
    .bind(owner)
    .bind(expires_at)
    .bind(id)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Extends our lease. Fails (returns `false`) if someone else has taken it or the tenant was stopped.
pub async fn renew_lease(
    id: TenantId,
    owner: &str,
    expires_at: i64,
    conn: &mut SqliteConnection,
) -> Result<bool, TenantError> {
    let result = sqlx::query(
        "UPDATE tenants SET lease_expires_at = $1 WHERE id = $2 AND lease_owner = $3 AND running = TRUE",
    )
    .bind(expires_at)
    .bind(id)
    .bind(owner)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn release_lease(id: TenantId, owner: &str, conn: &mut SqliteConnection) -> Result<(), TenantError> {
    sqlx::query("UPDATE tenants SET lease_owner = NULL, lease_expires_at = NULL WHERE id = $1 AND lease_owner = $2")
        .bind(id)
        .bind(owner)
        .execute(conn)
        .await?;
    Ok(())
}
