use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{CreditKind, CreditNote, Currency, Money, Referral, ReferralStats, UserAccount},
    traits::{LedgerError, LedgerManagement},
};

/// `LedgerApi` is the entry point for everything that reads or moves an account balance.
pub struct LedgerApi<B> {
    db: B,
}

impl<B> Debug for LedgerApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LedgerApi")
    }
}

impl<B> LedgerApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> LedgerApi<B>
where B: LedgerManagement
{
    pub async fn account(&self, user_id: i64) -> Result<Option<UserAccount>, LedgerError> {
        self.db.fetch_account(user_id).await
    }

    /// Fetches the account, creating it on first contact.
    pub async fn open_account(&self, user_id: i64, user_name: &str, channel_id: i64) -> Result<UserAccount, LedgerError> {
        self.db.fetch_or_create_account(user_id, user_name, channel_id).await
    }

    /// A paid top-up. Armed discounts and referral commission apply.
    pub async fn top_up(&self, user_id: i64, amount: Money) -> Result<CreditNote, LedgerError> {
        self.credit(user_id, amount, CreditKind::TopUp).await
    }

    pub async fn credit(&self, user_id: i64, amount: Money, kind: CreditKind) -> Result<CreditNote, LedgerError> {
        let note = self.db.credit(user_id, amount, kind).await?;
        info!(
            "💰️ Account {user_id} credited {} ({kind}). Bonus: {}, referral commission: {}",
            note.credited, note.bonus, note.commission
        );
        Ok(note)
    }

    pub async fn debit(&self, user_id: i64, amount: Money) -> Result<UserAccount, LedgerError> {
        match self.db.debit(user_id, amount).await {
            Ok(account) => {
                info!("💰️ Account {user_id} debited {amount}. Balance is now {}", account.balance);
                Ok(account)
            },
            Err(e) => {
                debug!("💰️ Debit of {amount} from account {user_id} refused. {e}");
                Err(e)
            },
        }
    }

    pub async fn set_currency(&self, user_id: i64, currency: Currency) -> Result<UserAccount, LedgerError> {
        self.db.set_currency(user_id, currency).await
    }

    pub async fn link_referral(&self, referrer_id: i64, referred_id: i64) -> Result<Option<Referral>, LedgerError> {
        self.db.link_referral(referrer_id, referred_id).await
    }

    pub async fn referral_stats(&self, referrer_id: i64) -> Result<ReferralStats, LedgerError> {
        self.db.referral_stats(referrer_id).await
    }
}
