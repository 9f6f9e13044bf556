use std::time::Duration;

use async_trait::async_trait;
use smm_common::Secret;
use smm_engine::{
    db_types::{BotIdentity, InboundUpdate},
    events::{EventProducer, TenantRegisteredEvent},
    traits::{BotTransport, TenantError, TenantManagement, TransportError},
    TenantApi,
    MAX_TENANTS_PER_OWNER,
};

use crate::support::prepare_env::{fresh_database, tear_down};

mod support;

/// Accepts any token that looks like `<id>:<secret>`.
struct FakeTransport;

#[async_trait]
impl BotTransport for FakeTransport {
    async fn validate(&self, token: &Secret<String>) -> Result<BotIdentity, TransportError> {
        let (id, _) = token.reveal().split_once(':').ok_or_else(|| TransportError::InvalidToken("malformed".into()))?;
        let id = id.parse().map_err(|_| TransportError::InvalidToken("malformed".into()))?;
        Ok(BotIdentity { id, username: format!("bot{id}") })
    }

    async fn next_updates(&self, _: &Secret<String>, _: i64) -> Result<Vec<InboundUpdate>, TransportError> {
        Ok(vec![])
    }

    async fn send_message(&self, _: &Secret<String>, _: i64, _: &str) -> Result<(), TransportError> {
        Ok(())
    }

    async fn is_chat_admin(&self, _: &Secret<String>, _: i64, _: i64) -> Result<bool, TransportError> {
        Ok(false)
    }
}

fn token(n: i64) -> Secret<String> {
    Secret::new(format!("{n}:AAH-secret"))
}

#[tokio::test]
async fn owners_are_limited_to_ten_bots() {
    let db = fresh_database().await;
    let api = TenantApi::new(db.clone());
    for n in 0..MAX_TENANTS_PER_OWNER {
        let tenant = api.register(&FakeTransport, 1, "owner", token(n)).await.unwrap();
        assert!(tenant.running);
        assert_eq!(tenant.bot_name, format!("bot{n}"));
    }
    let err = api.register(&FakeTransport, 1, "owner", token(99)).await.unwrap_err();
    assert!(matches!(err, TenantError::TenantLimitReached { owner_id: 1, limit: 10 }));
    assert_eq!(api.tenants_for_owner(1).await.unwrap().len(), 10);
    // A different owner is unaffected
    assert!(api.register(&FakeTransport, 2, "other", token(99)).await.is_ok());
    tear_down(db).await;
}

#[tokio::test]
async fn tokens_are_validated_and_unique() {
    let db = fresh_database().await;
    let api = TenantApi::new(db.clone());
    let err = api.register(&FakeTransport, 1, "owner", Secret::new("garbage".to_string())).await.unwrap_err();
    assert!(matches!(err, TenantError::InvalidToken(_)));
    api.register(&FakeTransport, 1, "owner", token(5)).await.unwrap();
    let err = api.register(&FakeTransport, 2, "thief", token(5)).await.unwrap_err();
    assert!(matches!(err, TenantError::TokenAlreadyRegistered));
    tear_down(db).await;
}

#[tokio::test]
async fn one_lease_per_tenant() {
    let db = fresh_database().await;
    let api = TenantApi::new(db.clone());
    let tenant = api.register(&FakeTransport, 1, "owner", token(1)).await.unwrap();
    let ttl = Duration::from_secs(30);

    assert!(db.try_acquire_lease(tenant.id, "supervisor-a", ttl).await.unwrap());
    assert!(!db.try_acquire_lease(tenant.id, "supervisor-b", ttl).await.unwrap());
    // Re-acquiring your own lease is fine
    assert!(db.try_acquire_lease(tenant.id, "supervisor-a", ttl).await.unwrap());
    assert!(db.renew_lease(tenant.id, "supervisor-a", ttl).await.unwrap());
    assert!(!db.renew_lease(tenant.id, "supervisor-b", ttl).await.unwrap());

    db.release_lease(tenant.id, "supervisor-b").await.unwrap();
    assert!(!db.try_acquire_lease(tenant.id, "supervisor-b", ttl).await.unwrap());
    db.release_lease(tenant.id, "supervisor-a").await.unwrap();
    assert!(db.try_acquire_lease(tenant.id, "supervisor-b", ttl).await.unwrap());
    tear_down(db).await;
}

#[tokio::test]
async fn expired_leases_can_be_taken_over() {
    let db = fresh_database().await;
    let api = TenantApi::new(db.clone());
    let tenant = api.register(&FakeTransport, 1, "owner", token(1)).await.unwrap();
    assert!(db.try_acquire_lease(tenant.id, "crashed", Duration::from_millis(1)).await.unwrap());
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(db.try_acquire_lease(tenant.id, "survivor", Duration::from_secs(30)).await.unwrap());
    assert!(!db.renew_lease(tenant.id, "crashed", Duration::from_secs(30)).await.unwrap());
    tear_down(db).await;
}

#[tokio::test]
async fn stopping_a_tenant_revokes_its_lease() {
    let db = fresh_database().await;
    let api = TenantApi::new(db.clone());
    let tenant = api.register(&FakeTransport, 1, "owner", token(1)).await.unwrap();
    let ttl = Duration::from_secs(30);
    assert!(db.try_acquire_lease(tenant.id, "supervisor-a", ttl).await.unwrap());
    assert_eq!(db.running_tenants().await.unwrap(), vec![tenant.id]);

    api.stop(tenant.id).await.unwrap();
    assert!(db.running_tenants().await.unwrap().is_empty());
    assert!(!db.renew_lease(tenant.id, "supervisor-a", ttl).await.unwrap());
    assert!(!db.try_acquire_lease(tenant.id, "supervisor-b", ttl).await.unwrap());

    api.resume(tenant.id).await.unwrap();
    assert_eq!(db.running_tenants().await.unwrap(), vec![tenant.id]);
    tear_down(db).await;
}

#[tokio::test]
async fn resume_survives_a_full_supervisor_channel() {
    let db = fresh_database().await;
    let (sender, mut receiver) = tokio::sync::mpsc::channel(1);
    let api = TenantApi::new(db.clone()).with_notifier(EventProducer::new(sender));
    let tenant = api.register(&FakeTransport, 1, "owner", token(1)).await.unwrap();
    api.stop(tenant.id).await.unwrap();

    // The registration nudge still fills the buffer, so this one is dropped
    api.resume(tenant.id).await.unwrap();
    assert_eq!(db.running_tenants().await.unwrap(), vec![tenant.id]);
    assert_eq!(receiver.try_recv().unwrap(), TenantRegisteredEvent { tenant: tenant.id });
    assert!(receiver.try_recv().is_err());

    api.stop(tenant.id).await.unwrap();
    api.resume(tenant.id).await.unwrap();
    assert_eq!(receiver.try_recv().unwrap(), TenantRegisteredEvent { tenant: tenant.id });
    tear_down(db).await;
}
