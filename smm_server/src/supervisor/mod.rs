//! # Tenant worker supervisor
//!
//! The supervisor keeps exactly one worker alive for every tenant with `running = true`, across all server processes.
//!
//! * New tenants arrive on a bounded channel and are started straight away.
//! * Every `scan_interval` (or `retry_interval` after a failed scan) the tenant table is rescanned, which picks up
//!   tenants whose notification was lost, tenants whose worker exited, and tenants whose previous owner crashed.
//! * Workers are tracked in memory by [`TenantId`]. Across processes, a durable lease decides who may run a tenant: the
//!   supervisor must acquire the lease before it spawns a worker, and the worker renews it on a heartbeat.
use std::{collections::HashMap, sync::Arc, time::Duration};

use futures_util::FutureExt;
use log::*;
use smm_engine::{
    db_types::TenantId,
    events::{EventProducer, TenantRegisteredEvent},
    traits::{BotTransport, TenantError, TenantManagement, TransportError},
    SqliteDatabase,
};
use tokio::{sync::mpsc, task::JoinHandle, time::Instant};

mod update_handler;
mod worker;


pub use update_handler::{Command, UpdateHandler};
pub use worker::{heartbeat_period, TenantWorker, WorkerExit};

pub const NEW_TENANT_CHANNEL_CAPACITY: usize = 100;
pub const DEFAULT_SCAN_RETRY_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    pub scan_interval: Duration,
    pub retry_interval: Duration,
    pub lease_ttl: Duration,
}

impl SupervisorConfig {
    pub fn new(scan_interval: Duration, lease_ttl: Duration) -> Self {
        Self { scan_interval, retry_interval: DEFAULT_SCAN_RETRY_INTERVAL, lease_ttl }
    }
}

/// Creates the channel that carries newly registered tenants to the supervisor. Hand the producer to
/// `TenantApi::with_notifier` and the receiver to [`WorkerSupervisor::new`].
pub fn new_tenant_channel() -> (EventProducer<TenantRegisteredEvent>, mpsc::Receiver<TenantRegisteredEvent>) {
    let (sender, receiver) = mpsc::channel(NEW_TENANT_CHANNEL_CAPACITY);
    (EventProducer::new(sender), receiver)
}

pub struct WorkerSupervisor {
    id: String,
    db: SqliteDatabase,
    transport: Arc<dyn BotTransport>,
    handler: Arc<UpdateHandler>,
    config: SupervisorConfig,
    workers: HashMap<TenantId, JoinHandle<WorkerExit>>,
    new_tenants: mpsc::Receiver<TenantRegisteredEvent>,
}

impl WorkerSupervisor {
    pub fn new(
        db: SqliteDatabase,
        transport: Arc<dyn BotTransport>,
        handler: Arc<UpdateHandler>,
        new_tenants: mpsc::Receiver<TenantRegisteredEvent>,
        config: SupervisorConfig,
    ) -> Self {
        let id = format!("supervisor-{:016x}", rand::random::<u64>());
        Self { id, db, transport, handler, config, workers: HashMap::new(), new_tenants }
    }

    /// The lease owner name this supervisor's workers use
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The tenants that currently have a live worker in this process
    pub fn active_workers(&mut self) -> Vec<TenantId> {
        self.prune();
        let mut ids = self.workers.keys().copied().collect::<Vec<_>>();
        ids.sort();
        ids
    }

    /// Runs the supervisor until the process exits. Do not await this directly; spawn it.
    pub async fn run(mut self) {
        info!("🤖️ Supervisor {} started", self.id);
        let mut next_scan = Instant::now();
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(next_scan) => {
                    let delay = match self.scan().await {
                        Ok(started) => {
                            debug!("🤖️ Tenant scan complete. {started} workers started, {} running", self.workers.len());
                            self.config.scan_interval
                        },
                        Err(e) => {
                            warn!("🤖️ Tenant scan failed. Retrying in {}s. {e}", self.config.retry_interval.as_secs());
                            self.config.retry_interval
                        },
                    };
                    next_scan = Instant::now() + delay;
                },
                Some(ev) = self.new_tenants.recv() => {
                    if let Err(e) = self.start_tenant(ev.tenant).await {
                        warn!("🤖️ Could not start new tenant {}. The next scan will try again. {e}", ev.tenant);
                    }
                },
            }
        }
    }

    /// Starts a worker for every running tenant that doesn't have one. Returns the number of workers started.
    pub async fn scan(&mut self) -> Result<usize, TenantError> {
        let ids = self.db.running_tenants().await?;
        let mut started = 0;
        for id in ids {
            match self.start_tenant(id).await {
                Ok(true) => started += 1,
                Ok(false) => {},
                Err(e) => warn!("🤖️ Could not start {id}. {e}"),
            }
        }
        Ok(started)
    }

    /// Starts a worker for `id` unless one is already running here or elsewhere.
    ///
    /// Returns `true` if a worker was spawned. A tenant whose token is rejected is marked not running and will not be
    /// retried until its owner resumes it.
    pub async fn start_tenant(&mut self, id: TenantId) -> Result<bool, TenantError> {
        self.prune();
        if self.workers.contains_key(&id) {
            trace!("🤖️ {id} already has a worker");
            return Ok(false);
        }
        if !self.db.try_acquire_lease(id, &self.id, self.config.lease_ttl).await? {
            debug!("🤖️ {id} is leased by another supervisor, or no longer running");
            return Ok(false);
        }
        let Some(tenant) = self.db.fetch_tenant(id).await? else {
            self.db.release_lease(id, &self.id).await?;
            return Ok(false);
        };
        match self.transport.validate(&tenant.token).await {
            Ok(identity) => trace!("🤖️ {id} token belongs to @{}", identity.username),
            Err(TransportError::InvalidToken(e)) => {
                warn!("🤖️ The token for {id} was rejected. Marking the tenant as stopped. {e}");
                self.db.set_running(id, false).await?;
                self.db.release_lease(id, &self.id).await?;
                return Ok(false);
            },
            Err(TransportError::Unavailable(e)) => {
                warn!("🤖️ Could not validate the token for {id}. Will retry on the next scan. {e}");
                self.db.release_lease(id, &self.id).await?;
                return Ok(false);
            },
        }
        let worker = TenantWorker::new(
            tenant,
            self.db.clone(),
            Arc::clone(&self.transport),
            Arc::clone(&self.handler),
            self.id.clone(),
            self.config.lease_ttl,
        );
        self.workers.insert(id, tokio::spawn(worker.run()));
        Ok(true)
    }

    /// Stops every worker and releases their leases.
    pub async fn shutdown(&mut self) {
        for (id, handle) in self.workers.drain() {
            handle.abort();
            if let Err(e) = self.db.release_lease(id, &self.id).await {
                warn!("🤖️ Could not release the lease for {id}. {e}");
            }
        }
        info!("🤖️ Supervisor {} shut down", self.id);
    }

    /// Forgets workers that have exited, so that the next scan can restart them.
    fn prune(&mut self) {
        let finished = self.workers.iter().filter(|(_, h)| h.is_finished()).map(|(id, _)| *id).collect::<Vec<_>>();
        for id in finished {
            let Some(handle) = self.workers.remove(&id) else { continue };
            match handle.now_or_never() {
                Some(Ok(exit)) => debug!("🤖️ Worker for {id} exited: {exit}"),
                // a panicked worker never reached its own lease release; the lease will expire after one TTL
                Some(Err(e)) => error!("🤖️ Worker for {id} failed. {e}"),
                None => {},
            }
        }
    }
}
