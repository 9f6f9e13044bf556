use std::fmt::Debug;

use log::*;
use smm_common::Secret;

use crate::{
    db_types::{NewTenant, Tenant, TenantId},
    events::{EventProducer, TenantRegisteredEvent},
    traits::{BotTransport, TenantError, TenantManagement, TransportError},
};

pub const MAX_TENANTS_PER_OWNER: i64 = 10;

/// `TenantApi` registers tenant bots and toggles whether they should run.
///
/// Registration writes the durable record first and then nudges the supervisor through the optional
/// `new_tenants` channel. If the nudge is lost, the supervisor still picks the tenant up on its next scan.
pub struct TenantApi<B> {
    db: B,
    new_tenants: Option<EventProducer<TenantRegisteredEvent>>,
}

impl<B> Debug for TenantApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TenantApi")
    }
}

impl<B> TenantApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, new_tenants: None }
    }

    pub fn with_notifier(mut self, producer: EventProducer<TenantRegisteredEvent>) -> Self {
        self.new_tenants = Some(producer);
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> TenantApi<B>
where B: TenantManagement
{
    pub async fn register(
        &self,
        transport: &dyn BotTransport,
        owner_id: i64,
        owner_name: &str,
        token: Secret<String>,
    ) -> Result<Tenant, TenantError> {
        let count = self.db.count_tenants(owner_id).await?;
        if count >= MAX_TENANTS_PER_OWNER {
            return Err(TenantError::TenantLimitReached { owner_id, limit: MAX_TENANTS_PER_OWNER });
        }
        let identity = transport.validate(&token).await.map_err(|e| match e {
            TransportError::InvalidToken(s) => TenantError::InvalidToken(s),
            TransportError::Unavailable(s) => TenantError::TransportUnavailable(s),
        })?;
        let tenant = NewTenant { owner_id, owner_name: owner_name.to_string(), token, bot_name: identity.username };
        let tenant = self.db.insert_tenant(tenant, MAX_TENANTS_PER_OWNER).await?;
        info!("🤖️ Registered bot @{} as {} for owner {owner_id}", tenant.bot_name, tenant.id);
        if let Some(producer) = &self.new_tenants {
            if !producer.try_publish_event(TenantRegisteredEvent { tenant: tenant.id }) {
                debug!("🤖️ Supervisor notification for {} was dropped. It will be picked up on the next scan", tenant.id);
            }
        }
        Ok(tenant)
    }

    pub async fn stop(&self, id: TenantId) -> Result<(), TenantError> {
        self.set_running(id, false).await
    }

    pub async fn resume(&self, id: TenantId) -> Result<(), TenantError> {
        self.set_running(id, true).await?;
        if let Some(producer) = &self.new_tenants {
            if !producer.try_publish_event(TenantRegisteredEvent { tenant: id }) {
                debug!("🤖️ Supervisor notification for resumed {id} was dropped. It will be picked up on the next scan");
            }
        }
        Ok(())
    }

    async fn set_running(&self, id: TenantId, running: bool) -> Result<(), TenantError> {
        if self.db.fetch_tenant(id).await?.is_none() {
            return Err(TenantError::TenantNotFound(id));
        }
        self.db.set_running(id, running).await?;
        info!("🤖️ {id} running = {running}");
        Ok(())
    }

    pub async fn tenants_for_owner(&self, owner_id: i64) -> Result<Vec<Tenant>, TenantError> {
        self.db.tenants_for_owner(owner_id).await
    }
}
