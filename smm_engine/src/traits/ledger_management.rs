use thiserror::Error;

use crate::db_types::{CreditKind, CreditNote, Currency, Money, Referral, ReferralStats, UserAccount};

#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("The requested account {0} does not exist")]
    AccountNotFound(i64),
    #[error("Account {account} has insufficient funds. Requested {requested}, but only {available} is available")]
    InsufficientFunds { account: i64, requested: Money, available: Money },
    #[error("Ledger amounts must be positive, but got {0}")]
    InvalidAmount(Money),
    #[error("Referral rejected: {0}")]
    ReferralRejected(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

/// The ledger is the single owner of account balances.
///
/// Every balance change is a single atomic `UPDATE ... SET balance = balance ± ?` statement, executed in a transaction
/// together with any bookkeeping it implies (armed discount consumption, referral commission). Two concurrent credits on
/// the same account can therefore never lose an update, and a debit can never overdraw an account.
#[allow(async_fn_in_trait)]
pub trait LedgerManagement {
    /// Fetches the account for the given user id. If no account exists, `None` is returned.
    async fn fetch_account(&self, user_id: i64) -> Result<Option<UserAccount>, LedgerError>;

    /// Fetches the account for the given user id, creating an empty USD account if one does not exist yet.
    async fn fetch_or_create_account(
        &self,
        user_id: i64,
        user_name: &str,
        channel_id: i64,
    ) -> Result<UserAccount, LedgerError>;

    /// Credits `amount` to the account, creating it if necessary.
    ///
    /// For [`CreditKind::TopUp`] and [`CreditKind::PromoBonus`] credits:
    /// * If the account has an armed discount promo code, the amount is boosted by the code's percentage and the code
    ///   is marked as used.
    /// * If the account was referred, the referrer receives 10% of the (boosted) amount, and the commission is
    ///   accumulated on the referral record.
    ///
    /// [`CreditKind::Refund`] credits add exactly `amount` and nothing else.
    async fn credit(&self, user_id: i64, amount: Money, kind: CreditKind) -> Result<CreditNote, LedgerError>;

    /// Atomically debits `amount` from the account. If the balance is lower than `amount`,
    /// [`LedgerError::InsufficientFunds`] is returned and the balance is unchanged.
    async fn debit(&self, user_id: i64, amount: Money) -> Result<UserAccount, LedgerError>;

    /// Changes the display currency for the account.
    async fn set_currency(&self, user_id: i64, currency: Currency) -> Result<UserAccount, LedgerError>;

    /// Links `referred_id` to `referrer_id`. An account can only be referred once; the first referrer wins.
    ///
    /// Returns `None` if the account was already referred. Self-referrals and unknown referrers are rejected.
    async fn link_referral(&self, referrer_id: i64, referred_id: i64) -> Result<Option<Referral>, LedgerError>;

    /// The referral record for a referred account, if any.
    async fn fetch_referral(&self, referred_id: i64) -> Result<Option<Referral>, LedgerError>;

    /// How many accounts `referrer_id` has referred, and the total commission earned from them.
    async fn referral_stats(&self, referrer_id: i64) -> Result<ReferralStats, LedgerError>;
}
