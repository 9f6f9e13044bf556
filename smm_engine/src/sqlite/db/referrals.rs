use sqlx::SqliteConnection;

use crate::{
    db_types::{Money, Referral, ReferralStats},
    traits::LedgerError,
};

pub async fn fetch_referral_for(
    referred_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Referral>, LedgerError> {
    let referral =
        sqlx::query_as("SELECT * FROM referrals WHERE referred_id = $1").bind(referred_id).fetch_optional(conn).await?;
    Ok(referral)
}

/// Inserts the referral unless the account has already been referred, in which case `None` is returned.
pub async fn insert_referral(
    referrer_id: i64,
    referred_id: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<Referral>, LedgerError> {
    let referral = sqlx::query_as(
        r#"INSERT INTO referrals (referrer_id, referred_id) VALUES ($1, $2)
        ON CONFLICT (referred_id) DO NOTHING
        RETURNING *"#,
    )
    .bind(referrer_id)
    .bind(referred_id)
    .fetch_optional(conn)
    .await?;
    Ok(referral)
}

pub async fn add_commission(id: i64, amount: Money, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    sqlx::query("UPDATE referrals SET amount_earned = amount_earned + $1 WHERE id = $2")
        .bind(amount)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn referral_stats(referrer_id: i64, conn: &mut SqliteConnection) -> Result<ReferralStats, LedgerError> {
    let stats = sqlx::query_as(
        r#"SELECT COUNT(*) AS referred_count, COALESCE(SUM(amount_earned), 0) AS total_earned
        FROM referrals WHERE referrer_id = $1"#,
    )
    .bind(referrer_id)
    .fetch_one(conn)
    .await?;
    Ok(stats)
}
