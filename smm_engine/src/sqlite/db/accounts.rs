use log::*;
use sqlx::SqliteConnection;

use crate::{
    db_types::{CreditKind, CreditNote, Currency, Money, UserAccount},
    sqlite::db::{promos, referrals},
    traits::LedgerError,
};

/// Referrers earn this percentage of every qualifying credit to the accounts they referred.
pub const REFERRAL_COMMISSION_PERCENT: f64 = 10.0;

pub async fn fetch_account(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<UserAccount>, LedgerError> {
    let account = sqlx::query_as("SELECT * FROM accounts WHERE user_id = $1").bind(user_id).fetch_optional(conn).await?;
    Ok(account)
}

/// Creates the account if it does not exist, and touches `updated_at` if it does.
///
/// Because this is a write, calling it first inside a transaction takes the database write lock up front. Every balance
/// mutation in the crate starts this way, so concurrent mutations of the same account are serialised rather than
/// failing on a read-to-write lock upgrade.
pub async fn ensure_account(user_id: i64, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    sqlx::query(
        r#"INSERT INTO accounts (user_id) VALUES ($1)
        ON CONFLICT (user_id) DO UPDATE SET updated_at = CURRENT_TIMESTAMP"#,
    )
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn fetch_or_create_account(
    user_id: i64,
    user_name: &str,
    channel_id: i64,
    conn: &mut SqliteConnection,
) -> Result<UserAccount, LedgerError> {
    let account = sqlx::query_as(
        r#"INSERT INTO accounts (user_id, user_name, channel_id) VALUES ($1, $2, $3)
        ON CONFLICT (user_id) DO UPDATE SET
            user_name = CASE WHEN excluded.user_name = '' THEN accounts.user_name ELSE excluded.user_name END,
            channel_id = CASE WHEN excluded.channel_id = 0 THEN accounts.channel_id ELSE excluded.channel_id END,
            updated_at = CURRENT_TIMESTAMP
        RETURNING *"#,
    )
    .bind(user_id)
    .bind(user_name)
    .bind(channel_id)
    .fetch_one(conn)
    .await?;
    Ok(account)
}

/// Adds `amount` to the balance with a single atomic update.
pub async fn increment_balance(user_id: i64, amount: Money, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    let result = sqlx::query(
        "UPDATE accounts SET balance = balance + $1, updated_at = CURRENT_TIMESTAMP WHERE user_id = $2",
    )
    .bind(amount)
    .bind(user_id)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(LedgerError::AccountNotFound(user_id));
    }
    Ok(())
}

/// Subtracts `amount` from the balance if, and only if, the balance covers it. Returns `false` when it doesn't.
pub async fn try_decrement_balance(
    user_id: i64,
    amount: Money,
    conn: &mut SqliteConnection,
) -> Result<bool, LedgerError> {
    let result = sqlx::query(
        r#"UPDATE accounts SET balance = balance - $1, updated_at = CURRENT_TIMESTAMP
        WHERE user_id = $2 AND balance >= $1"#,
    )
    .bind(amount)
    .bind(user_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn set_currency(
    user_id: i64,
    currency: Currency,
    conn: &mut SqliteConnection,
) -> Result<UserAccount, LedgerError> {
    let account: Option<UserAccount> = sqlx::query_as(
        "UPDATE accounts SET currency = $1, updated_at = CURRENT_TIMESTAMP WHERE user_id = $2 RETURNING *",
    )
    .bind(currency)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;
    account.ok_or(LedgerError::AccountNotFound(user_id))
}

/// The full credit procedure. The caller owns the transaction.
///
/// 1. The account is created if needed (and the write lock taken).
/// 2. For bonus-earning credits, the oldest armed discount code is consumed and its percentage added.
/// 3. The (possibly boosted) amount is added to the balance.
/// 4. For bonus-earning credits, the referrer (if any) receives the commission, which is also accumulated on the
///    referral record.
pub async fn credit_account(
    user_id: i64,
    amount: Money,
    kind: CreditKind,
    conn: &mut SqliteConnection,
) -> Result<CreditNote, LedgerError> {
    if !amount.is_positive() {
        return Err(LedgerError::InvalidAmount(amount));
    }
    ensure_account(user_id, conn).await?;
    let mut note = CreditNote { user_id, ..Default::default() };
    if kind.earns_bonuses() {
        if let Some((code, percent)) = promos::consume_armed_discount(user_id, conn).await? {
            note.bonus = amount.percent(percent);
            debug!("💰️ Armed promo code {code} adds {percent}% ({}) to the {kind} for account {user_id}", note.bonus);
        }
    }
    note.credited = amount + note.bonus;
    increment_balance(user_id, note.credited, conn).await?;
    trace!("💰️ Account {user_id} credited with {} ({kind})", note.credited);
    if kind.earns_bonuses() {
        if let Some(referral) = referrals::fetch_referral_for(user_id, conn).await? {
            let commission = note.credited.percent(REFERRAL_COMMISSION_PERCENT);
            if commission.is_positive() {
                increment_balance(referral.referrer_id, commission, conn).await?;
                referrals::add_commission(referral.id, commission, conn).await?;
                debug!("💰️ Referrer {} earned {commission} from account {user_id}", referral.referrer_id);
            }
            note.commission = commission;
            note.referrer = Some(referral.referrer_id);
        }
    }
    Ok(note)
}
