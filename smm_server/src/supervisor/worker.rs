use std::{fmt::Display, sync::Arc, time::Duration};

use log::*;
use smm_engine::{
    db_types::Tenant,
    traits::{BotTransport, TenantManagement, TransportError},
    SqliteDatabase,
};
use tokio::time::MissedTickBehavior;

use super::update_handler::UpdateHandler;

const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);
const MIN_HEARTBEAT: Duration = Duration::from_millis(10);

/// Why a worker stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// The lease expired or was taken over, or the tenant was stopped.
    LeaseLost,
    /// The transport no longer accepts the token. The tenant has been marked not running.
    TokenRevoked,
}

impl Display for WorkerExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerExit::LeaseLost => write!(f, "lease lost"),
            WorkerExit::TokenRevoked => write!(f, "token revoked"),
        }
    }
}

pub fn heartbeat_period(lease_ttl: Duration) -> Duration {
    (lease_ttl / 3).max(MIN_HEARTBEAT)
}

/// The consumer loop for one tenant bot.
///
/// The worker long-polls the transport and hands each update to the [`UpdateHandler`] in order. Between polls it
/// renews its lease every `ttl / 3`. It stops as soon as the lease cannot be renewed, and releases the lease on the
/// way out.
pub struct TenantWorker {
    tenant: Tenant,
    db: SqliteDatabase,
    transport: Arc<dyn BotTransport>,
    handler: Arc<UpdateHandler>,
    lease_owner: String,
    lease_ttl: Duration,
}

impl TenantWorker {
    pub fn new(
        tenant: Tenant,
        db: SqliteDatabase,
        transport: Arc<dyn BotTransport>,
        handler: Arc<UpdateHandler>,
        lease_owner: String,
        lease_ttl: Duration,
    ) -> Self {
        Self { tenant, db, transport, handler, lease_owner, lease_ttl }
    }

    pub async fn run(self) -> WorkerExit {
        let id = self.tenant.id;
        info!("🤖️ Worker for {id} (@{}) started", self.tenant.bot_name);
        let mut heartbeat = tokio::time::interval(heartbeat_period(self.lease_ttl));
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The supervisor has only just acquired the lease
        heartbeat.tick().await;
        let mut offset = 0;
        let mut poll = self.transport.next_updates(&self.tenant.token, offset);
        let exit = loop {
            tokio::select! {
                _ = heartbeat.tick() => match self.db.renew_lease(id, &self.lease_owner, self.lease_ttl).await {
                    Ok(true) => trace!("🤖️ {id} lease renewed"),
                    Ok(false) => {
                        info!("🤖️ {id} lost its lease. Stopping the worker");
                        break WorkerExit::LeaseLost;
                    },
                    Err(e) => warn!("🤖️ Could not renew the lease for {id}. Will try again on the next heartbeat. {e}"),
                },
                result = &mut poll => {
                    match result {
                        Ok(updates) => {
                            for update in updates {
                                offset = offset.max(update.update_id + 1);
                                self.handler.handle(&self.tenant, &update).await;
                            }
                        },
                        Err(TransportError::InvalidToken(e)) => {
                            warn!("🤖️ The token for {id} was revoked. Marking the tenant as stopped. {e}");
                            if let Err(e) = self.db.set_running(id, false).await {
                                error!("🤖️ Could not mark {id} as stopped. {e}");
                            }
                            break WorkerExit::TokenRevoked;
                        },
                        Err(TransportError::Unavailable(e)) => {
                            debug!("🤖️ Polling for {id} failed. Retrying in {}s. {e}", POLL_RETRY_DELAY.as_secs());
                            tokio::time::sleep(POLL_RETRY_DELAY).await;
                        },
                    }
                    poll = self.transport.next_updates(&self.tenant.token, offset);
                },
            }
        };
        if let Err(e) = self.db.release_lease(id, &self.lease_owner).await {
            warn!("🤖️ Could not release the lease for {id}. It will expire on its own. {e}");
        }
        info!("🤖️ Worker for {id} stopped: {exit}");
        exit
    }
}
