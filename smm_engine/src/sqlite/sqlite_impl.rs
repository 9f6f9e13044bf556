//! `SqliteDatabase` is a concrete implementation of a storefront engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`] module.
//! Each trait method that mutates money runs in its own transaction, and the first statement in that transaction is a
//! write, so that SQLite's single-writer lock serialises concurrent balance changes.
use std::{fmt::Debug, time::Duration};

use chrono::Utc;
use log::*;
use sqlx::{migrate, SqlitePool};

use super::db::{
    accounts,
    catalog,
    db_url,
    exchange_rates,
    idempotency,
    new_pool,
    orders,
    payments,
    promos,
    referrals,
    tenants,
};
use crate::{
    db_types::{
        CreditKind,
        CreditNote,
        Currency,
        ExchangeRate,
        Money,
        NewOrder,
        NewPayment,
        NewPromoCode,
        NewTenant,
        OperationKind,
        Order,
        OrderId,
        OrderStatusReport,
        Payment,
        PaymentStatus,
        PromoCode,
        PromoType,
        Redemption,
        Referral,
        ReferralStats,
        RefundMarker,
        Service,
        Tenant,
        TenantId,
        UsedPromoCode,
        UserAccount,
    },
    traits::{
        CatalogError,
        CatalogManagement,
        ExchangeRateError,
        ExchangeRates,
        LedgerError,
        LedgerManagement,
        OrderError,
        OrderManagement,
        PaymentError,
        PaymentManagement,
        PromoError,
        PromoManagement,
        ReconcileOutcome,
        Settlement,
        TenantError,
        TenantManagement,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Applies any outstanding schema migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&mut self) -> Result<(), sqlx::Error> {
        self.pool.close().await;
        Ok(())
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn lease_expiry(ttl: Duration) -> i64 {
    let ttl = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    now_millis().saturating_add(ttl)
}

impl LedgerManagement for SqliteDatabase {
    async fn fetch_account(&self, user_id: i64) -> Result<Option<UserAccount>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        accounts::fetch_account(user_id, &mut conn).await
    }

    async fn fetch_or_create_account(
        &self,
        user_id: i64,
        user_name: &str,
        channel_id: i64,
    ) -> Result<UserAccount, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        accounts::fetch_or_create_account(user_id, user_name, channel_id, &mut conn).await
    }

    async fn credit(&self, user_id: i64, amount: Money, kind: CreditKind) -> Result<CreditNote, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let note = accounts::credit_account(user_id, amount, kind, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Credit of {} to account {user_id} committed", note.credited);
        Ok(note)
    }

    async fn debit(&self, user_id: i64, amount: Money) -> Result<UserAccount, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let mut tx = self.pool.begin().await?;
        accounts::ensure_account(user_id, &mut tx).await?;
        if !accounts::try_decrement_balance(user_id, amount, &mut tx).await? {
            let available =
                accounts::fetch_account(user_id, &mut tx).await?.map(|a| a.balance).unwrap_or_default();
            tx.rollback().await?;
            return Err(LedgerError::InsufficientFunds { account: user_id, requested: amount, available });
        }
        let account =
            accounts::fetch_account(user_id, &mut tx).await?.ok_or(LedgerError::AccountNotFound(user_id))?;
        tx.commit().await?;
        debug!("🗃️ Debit of {amount} from account {user_id} committed. New balance: {}", account.balance);
        Ok(account)
    }

    async fn set_currency(&self, user_id: i64, currency: Currency) -> Result<UserAccount, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        accounts::set_currency(user_id, currency, &mut conn).await
    }

    async fn link_referral(&self, referrer_id: i64, referred_id: i64) -> Result<Option<Referral>, LedgerError> {
        if referrer_id == referred_id {
            return Err(LedgerError::ReferralRejected("accounts cannot refer themselves".into()));
        }
        let mut tx = self.pool.begin().await?;
        accounts::ensure_account(referred_id, &mut tx).await?;
        if accounts::fetch_account(referrer_id, &mut tx).await?.is_none() {
            tx.rollback().await?;
            return Err(LedgerError::ReferralRejected(format!("referrer {referrer_id} does not exist")));
        }
        let referral = referrals::insert_referral(referrer_id, referred_id, &mut tx).await?;
        tx.commit().await?;
        match &referral {
            Some(_) => debug!("🗃️ Account {referred_id} was referred by {referrer_id}"),
            None => trace!("🗃️ Account {referred_id} has already been referred. Ignoring referral by {referrer_id}"),
        }
        Ok(referral)
    }

    async fn fetch_referral(&self, referred_id: i64) -> Result<Option<Referral>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        referrals::fetch_referral_for(referred_id, &mut conn).await
    }

    async fn referral_stats(&self, referrer_id: i64) -> Result<ReferralStats, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        referrals::referral_stats(referrer_id, &mut conn).await
    }
}

impl PromoManagement for SqliteDatabase {
    async fn create_promo_code(&self, code: NewPromoCode) -> Result<PromoCode, PromoError> {
        if code.code.trim().is_empty() || code.max_activations < 1 || !(code.discount > 0.0) {
            return Err(PromoError::InvalidPromoCode(code.code));
        }
        let mut conn = self.pool.acquire().await?;
        let promo = promos::insert_promo_code(code, &mut conn).await?;
        debug!("🗃️ Promo code {} created", promo.code);
        Ok(promo)
    }

    async fn fetch_promo_code(&self, code: &str) -> Result<Option<PromoCode>, PromoError> {
        let mut conn = self.pool.acquire().await?;
        promos::fetch_promo_code(code, &mut conn).await
    }

    async fn redeem_promo_code(&self, user_id: i64, code: &str) -> Result<Redemption, PromoError> {
        let mut tx = self.pool.begin().await?;
        accounts::ensure_account(user_id, &mut tx).await?;
        let promo = promos::fetch_promo_code(code, &mut tx).await?.ok_or_else(|| PromoError::NotFound(code.into()))?;
        if promo.is_exhausted() {
            return Err(PromoError::Exhausted(code.into()));
        }
        if promos::fetch_used_promo_code(user_id, code, &mut tx).await?.is_some() {
            return Err(PromoError::AlreadyUsed(code.into()));
        }
        let reference = format!("{user_id}:{code}");
        if !idempotency::try_insert_key(OperationKind::PromoRedemption, &reference, &mut tx).await? {
            return Err(PromoError::AlreadyUsed(code.into()));
        }
        let redemption = match promo.promo_type {
            PromoType::Fixed => {
                let rate = match exchange_rates::fetch_last_rate(Currency::Rub, &mut tx).await {
                    Ok(rate) => rate,
                    Err(ExchangeRateError::RateDoesNotExist(_)) => return Err(PromoError::ExchangeRateUnavailable),
                    Err(e) => return Err(PromoError::DatabaseError(e.to_string())),
                };
                let face_value = Money::try_from(promo.discount)
                    .map_err(|e| PromoError::InvalidPromoCode(format!("{code}: {e}")))?;
                let amount = face_value.convert_from(rate.rate);
                let note = accounts::credit_account(user_id, amount, CreditKind::PromoBonus, &mut tx).await?;
                Redemption::Credited(note)
            },
            PromoType::Discount => Redemption::Armed { percent: promo.discount },
        };
        let used = matches!(redemption, Redemption::Credited(_));
        if !promos::insert_used_promo_code(user_id, code, used, &mut tx).await? {
            return Err(PromoError::AlreadyUsed(code.into()));
        }
        if !promos::try_increment_activations(code, &mut tx).await? {
            return Err(PromoError::Exhausted(code.into()));
        }
        tx.commit().await?;
        debug!("🗃️ Promo code {code} redeemed by account {user_id}");
        Ok(redemption)
    }

    async fn armed_promo_codes(&self, user_id: i64) -> Result<Vec<UsedPromoCode>, PromoError> {
        let mut conn = self.pool.acquire().await?;
        promos::armed_promo_codes(user_id, &mut conn).await
    }
}

impl OrderManagement for SqliteDatabase {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, OrderError> {
        let mut tx = self.pool.begin().await?;
        accounts::ensure_account(order.user_id, &mut tx).await?;
        let order = orders::insert_order(order, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} has been saved in the DB with id {}", order.order_id, order.id);
        Ok(order)
    }

    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_order_id(order_id, &mut conn).await
    }

    async fn orders_for_account(&self, user_id: i64) -> Result<Vec<Order>, OrderError> {
        let mut conn = self.pool.acquire().await?;
        orders::orders_for_account(user_id, &mut conn).await
    }

    async fn reconcile_order(&self, report: &OrderStatusReport) -> Result<ReconcileOutcome, OrderError> {
        let mut tx = self.pool.begin().await?;
        if !orders::lock_order(report.order_id, &mut tx).await? {
            return Ok(ReconcileOutcome::UnknownOrder(report.order_id));
        }
        let existing = orders::fetch_order_by_order_id(report.order_id, &mut tx)
            .await?
            .ok_or(OrderError::OrderNotFound(report.order_id))?;
        let changed = report.differs_from(&existing);
        let order = if changed {
            let order = orders::update_progress(report, &mut tx).await?;
            trace!("🗃️ Order {} moved from {} to {}", order.order_id, existing.status, order.status);
            order
        } else {
            existing
        };
        let no_refund = if changed { ReconcileOutcome::Updated } else { ReconcileOutcome::Unchanged };
        let amount = match report.refund_amount(&order) {
            Some(amount) if amount.is_positive() => amount,
            _ => {
                tx.commit().await?;
                return Ok(no_refund(order));
            },
        };
        let reference = order.order_id.value().to_string();
        if !idempotency::try_insert_key(OperationKind::OrderRefund, &reference, &mut tx).await? {
            tx.commit().await?;
            return Ok(ReconcileOutcome::AlreadyRefunded(order));
        }
        let note = accounts::credit_account(order.user_id, amount, CreditKind::Refund, &mut tx).await?;
        orders::insert_refund_marker(order.order_id, amount, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} ({}) refunded {amount} to account {}", order.order_id, order.status, order.user_id);
        Ok(ReconcileOutcome::Refunded { order, amount, note })
    }

    async fn fetch_refund_marker(&self, order_id: OrderId) -> Result<Option<RefundMarker>, OrderError> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_refund_marker(order_id, &mut conn).await
    }
}

impl PaymentManagement for SqliteDatabase {
    async fn insert_payment(&self, payment: NewPayment) -> Result<Payment, PaymentError> {
        if !payment.amount.is_positive() {
            return Err(PaymentError::InvalidAmount);
        }
        let mut tx = self.pool.begin().await?;
        accounts::ensure_account(payment.user_id, &mut tx).await?;
        let payment = payments::insert_payment(payment, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Payment {} for {} saved as {}", payment.reference, payment.amount, payment.status);
        Ok(payment)
    }

    async fn fetch_payment(&self, reference: &str) -> Result<Option<Payment>, PaymentError> {
        let mut conn = self.pool.acquire().await?;
        payments::fetch_payment(reference, &mut conn).await
    }

    async fn set_payment_url(&self, reference: &str, url: &str) -> Result<Payment, PaymentError> {
        let mut conn = self.pool.acquire().await?;
        let payment = payments::set_url(reference, url, &mut conn)
            .await?
            .ok_or_else(|| PaymentError::PaymentNotFound(reference.into()))?;
        trace!("🗃️ Payment {reference} has its checkout link");
        Ok(payment)
    }

    async fn settle_payment(&self, reference: &str) -> Result<Settlement, PaymentError> {
        let mut tx = self.pool.begin().await?;
        // The key insert is the first statement, so the write lock is held for the whole settlement
        let fresh = idempotency::try_insert_key(OperationKind::PaymentCredit, reference, &mut tx).await?;
        let payment = payments::fetch_payment(reference, &mut tx)
            .await?
            .ok_or_else(|| PaymentError::PaymentNotFound(reference.into()))?;
        if !fresh {
            tx.commit().await?;
            trace!("🗃️ Payment {reference} has already been credited");
            return Ok(Settlement::AlreadySettled(payment));
        }
        let Some(payment) = payments::mark_paid(reference, &mut tx).await? else {
            // Marked paid without a key. Keep the key so that replays get the same answer.
            tx.commit().await?;
            return Ok(Settlement::AlreadySettled(payment));
        };
        let note = accounts::credit_account(payment.user_id, payment.amount, CreditKind::TopUp, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Payment {reference} settled. {} credited to account {}", note.credited, payment.user_id);
        Ok(Settlement::Settled { payment, note })
    }

    async fn update_payment_status(&self, reference: &str, status: PaymentStatus) -> Result<Payment, PaymentError> {
        let mut tx = self.pool.begin().await?;
        if let Some(payment) = payments::update_unpaid_status(reference, status, &mut tx).await? {
            tx.commit().await?;
            debug!("🗃️ Payment {reference} is now {}", payment.status);
            return Ok(payment);
        }
        let existing = payments::fetch_payment(reference, &mut tx)
            .await?
            .ok_or_else(|| PaymentError::PaymentNotFound(reference.into()))?;
        tx.commit().await?;
        trace!("🗃️ Payment {reference} is already {}. Ignoring {status}", existing.status);
        Ok(existing)
    }
}

impl TenantManagement for SqliteDatabase {
    async fn insert_tenant(&self, tenant: NewTenant, limit: i64) -> Result<Tenant, TenantError> {
        let owner_id = tenant.owner_id;
        let mut tx = self.pool.begin().await?;
        // Owners are customers too. Touching their account takes the write lock before the count
        accounts::ensure_account(owner_id, &mut tx).await.map_err(|e| TenantError::DatabaseError(e.to_string()))?;
        if tenants::count_for_owner(owner_id, &mut tx).await? >= limit {
            return Err(TenantError::TenantLimitReached { owner_id, limit });
        }
        let tenant = tenants::insert_tenant(tenant, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Tenant {} (@{}) registered for owner {owner_id}", tenant.id, tenant.bot_name);
        Ok(tenant)
    }

    async fn count_tenants(&self, owner_id: i64) -> Result<i64, TenantError> {
        let mut conn = self.pool.acquire().await?;
        tenants::count_for_owner(owner_id, &mut conn).await
    }

    async fn fetch_tenant(&self, id: TenantId) -> Result<Option<Tenant>, TenantError> {
        let mut conn = self.pool.acquire().await?;
        tenants::fetch_tenant(id, &mut conn).await
    }

    async fn tenants_for_owner(&self, owner_id: i64) -> Result<Vec<Tenant>, TenantError> {
        let mut conn = self.pool.acquire().await?;
        tenants::tenants_for_owner(owner_id, &mut conn).await
    }

    async fn running_tenants(&self) -> Result<Vec<TenantId>, TenantError> {
        let mut conn = self.pool.acquire().await?;
        tenants::running_tenant_ids(&mut conn).await
    }

    async fn set_running(&self, id: TenantId, running: bool) -> Result<(), TenantError> {
        let mut conn = self.pool.acquire().await?;
        tenants::set_running(id, running, &mut conn).await?;
        debug!("🗃️ Tenant {id} running flag set to {running}");
        Ok(())
    }

    async fn try_acquire_lease(&self, id: TenantId, owner: &str, ttl: Duration) -> Result<bool, TenantError> {
        let mut conn = self.pool.acquire().await?;
        tenants::try_acquire_lease(id, owner, now_millis(), lease_expiry(ttl), &mut conn).await
    }

    async fn renew_lease(&self, id: TenantId, owner: &str, ttl: Duration) -> Result<bool, TenantError> {
        let mut conn = self.pool.acquire().await?;
        tenants::renew_lease(id, owner, lease_expiry(ttl), &mut conn).await
    }

    async fn release_lease(&self, id: TenantId, owner: &str) -> Result<(), TenantError> {
        let mut conn = self.pool.acquire().await?;
        tenants::release_lease(id, owner, &mut conn).await
    }
}

impl ExchangeRates for SqliteDatabase {
    async fn fetch_last_rate(&self, currency: Currency) -> Result<ExchangeRate, ExchangeRateError> {
        let mut conn = self.pool.acquire().await?;
        exchange_rates::fetch_last_rate(currency, &mut conn).await
    }

    async fn set_exchange_rate(&self, rate: &ExchangeRate) -> Result<(), ExchangeRateError> {
        if !rate.rate.is_finite() || rate.rate <= 0.0 {
            return Err(ExchangeRateError::InvalidRate(rate.rate));
        }
        let mut conn = self.pool.acquire().await?;
        exchange_rates::set_exchange_rate(rate, &mut conn).await
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_service(&self, service_id: &str) -> Result<Option<Service>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::fetch_service(service_id, &mut conn).await
    }

    async fn upsert_service(&self, service: &Service) -> Result<(), CatalogError> {
        let mut conn = self.pool.acquire().await?;
        catalog::upsert_service(service, &mut conn).await
    }
}
