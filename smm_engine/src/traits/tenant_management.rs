use std::time::Duration;

use thiserror::Error;

use crate::db_types::{NewTenant, Tenant, TenantId};

#[derive(Debug, Clone, Error)]
pub enum TenantError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Tenant {0} does not exist")]
    TenantNotFound(TenantId),
    #[error("Owner {owner_id} already runs the maximum of {limit} bots")]
    TenantLimitReached { owner_id: i64, limit: i64 },
    #[error("This bot token is already registered")]
    TokenAlreadyRegistered,
    #[error("The bot token was rejected by the transport: {0}")]
    InvalidToken(String),
    #[error("The bot transport is unavailable: {0}")]
    TransportUnavailable(String),
}

impl From<sqlx::Error> for TenantError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(de) if de.is_unique_violation() => TenantError::TokenAlreadyRegistered,
            e => TenantError::DatabaseError(e.to_string()),
        }
    }
}

/// The durable registry of tenant bots.
///
/// A tenant is eligible to run when `running = true`. At most one worker may run per tenant across all supervisor
/// processes. This is enforced by a lease (`lease_owner`, `lease_expires_at`) that a supervisor must acquire before
/// it starts the worker, and that the worker renews on a heartbeat. Expired leases may be taken over by anyone.
#[allow(async_fn_in_trait)]
pub trait TenantManagement {
    /// Registers a new tenant with `running = true`, provided the owner has fewer than `limit` tenants. The count and
    /// insert happen in one transaction.
    async fn insert_tenant(&self, tenant: NewTenant, limit: i64) -> Result<Tenant, TenantError>;

    async fn count_tenants(&self, owner_id: i64) -> Result<i64, TenantError>;

    async fn fetch_tenant(&self, id: TenantId) -> Result<Option<Tenant>, TenantError>;

    async fn tenants_for_owner(&self, owner_id: i64) -> Result<Vec<Tenant>, TenantError>;

    /// The ids of all tenants with `running = true`.
    async fn running_tenants(&self) -> Result<Vec<TenantId>, TenantError>;

    async fn set_running(&self, id: TenantId, running: bool) -> Result<(), TenantError>;

    /// Atomically takes the lease for `owner` if it is free, expired, or already held by `owner`.
    /// Returns `false` if another owner holds a live lease, or the tenant is not running.
    async fn try_acquire_lease(&self, id: TenantId, owner: &str, ttl: Duration) -> Result<bool, TenantError>;

    /// Extends a lease held by `owner`. Returns `false` if the lease has been lost.
    async fn renew_lease(&self, id: TenantId, owner: &str, ttl: Duration) -> Result<bool, TenantError>;

    /// Releases the lease if it is held by `owner`. Releasing a lease held by someone else is a no-op.
    async fn release_lease(&self, id: TenantId, owner: &str) -> Result<(), TenantError>;
}
