use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{CreditNote, NewPromoCode, PromoCode, PromoType, Redemption, Referral, UserAccount},
    events::{EventProducers, PromoRedeemedEvent},
    helpers::{parse_start_parameter, random_promo_code, StartParameter},
    traits::{LedgerManagement, PromoError, PromoManagement},
};

const MAX_CODE_GENERATION_ATTEMPTS: usize = 5;

/// The result of handling a `/start` deep link for an account.
#[derive(Debug, Clone)]
pub enum StartAction {
    /// A plain start, or a parameter that didn't lead anywhere.
    Welcome(UserAccount),
    /// The account was referred by `referral.referrer_id` for the first time.
    Referred { account: UserAccount, referral: Referral },
    /// The parameter was a special link. The redemption may have failed (unknown, exhausted or already used link).
    SpecialLink { account: UserAccount, code: String, result: Result<Redemption, PromoError> },
}

/// `PromoApi` handles promo codes, special links and referral deep links.
pub struct PromoApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for PromoApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PromoApi")
    }
}

impl<B> PromoApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> PromoApi<B>
where B: PromoManagement + LedgerManagement
{
    pub async fn create_promo_code(&self, code: NewPromoCode) -> Result<PromoCode, PromoError> {
        let promo = self.db.create_promo_code(code).await?;
        info!(
            "🎟️ Promo code {} created: {} {} with {} activations",
            promo.code, promo.promo_type, promo.discount, promo.max_activations
        );
        Ok(promo)
    }

    /// Creates a promo code with a random, unused 8-character name.
    pub async fn generate_promo_code(
        &self,
        discount: f64,
        max_activations: i64,
        promo_type: PromoType,
    ) -> Result<PromoCode, PromoError> {
        let mut last_err = None;
        for _ in 0..MAX_CODE_GENERATION_ATTEMPTS {
            let code = NewPromoCode::new(random_promo_code(), discount, max_activations, promo_type);
            match self.create_promo_code(code).await {
                Err(PromoError::AlreadyExists(code)) => {
                    debug!("🎟️ Generated promo code {code} is taken. Trying again.");
                    last_err = Some(PromoError::AlreadyExists(code));
                },
                result => return result,
            }
        }
        Err(last_err.unwrap_or_else(|| PromoError::InvalidPromoCode("code generation failed".into())))
    }

    /// Redeems a promo code. See [`PromoManagement::redeem_promo_code`] for the rules.
    pub async fn redeem(&self, user_id: i64, code: &str) -> Result<Redemption, PromoError> {
        let code = code.trim();
        let redemption = match self.db.redeem_promo_code(user_id, code).await {
            Ok(r) => r,
            Err(e) => {
                debug!("🎟️ Account {user_id} could not redeem {code}. {e}");
                return Err(e);
            },
        };
        match &redemption {
            Redemption::Credited(note) => {
                info!("🎟️ Account {user_id} redeemed {code} for {}", note.credited);
                self.call_promo_redeemed_hook(code, note.clone()).await;
            },
            Redemption::Armed { percent } => {
                info!("🎟️ Account {user_id} armed {code}. Their next top-up gets {percent}% extra");
            },
        }
        Ok(redemption)
    }

    async fn call_promo_redeemed_hook(&self, code: &str, note: CreditNote) {
        for emitter in &self.producers.promo_redeemed_producer {
            debug!("🎟️ Notifying promo redeemed hook subscribers");
            emitter.publish_event(PromoRedeemedEvent { code: code.to_string(), note: note.clone() }).await;
        }
    }

    /// Creates a special link: a fixed promo code named `<name>_` worth `amount` in the secondary currency, and the
    /// deep link that redeems it.
    pub async fn create_special_link(
        &self,
        name: &str,
        amount: f64,
        max_activations: i64,
        bot_link: &str,
    ) -> Result<(PromoCode, String), PromoError> {
        let name = name.trim();
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(PromoError::InvalidPromoCode(name.to_string()));
        }
        let code = format!("{name}_");
        let promo = self.create_promo_code(NewPromoCode::new(code, amount, max_activations, PromoType::Fixed)).await?;
        let link = format!("{bot_link}?start={}", promo.code);
        Ok((promo, link))
    }

    pub async fn redeem_special_link(&self, user_id: i64, param: &str) -> Result<Redemption, PromoError> {
        self.redeem(user_id, param).await
    }

    /// Handles `/start [param]`. The account is opened if this is first contact.
    ///
    /// * A parameter containing `_` is a special link and is redeemed.
    /// * A numeric parameter is a referrer id. Referral failures (self-referral, unknown referrer, already referred)
    ///   are not errors; the user just gets a normal welcome.
    pub async fn handle_start(
        &self,
        user_id: i64,
        user_name: &str,
        channel_id: i64,
        param: &str,
    ) -> Result<StartAction, PromoError> {
        let account = self.db.fetch_or_create_account(user_id, user_name, channel_id).await?;
        match parse_start_parameter(param) {
            StartParameter::SpecialLink(code) => {
                let result = self.redeem_special_link(user_id, &code).await;
                let account = self.db.fetch_account(user_id).await?.unwrap_or(account);
                Ok(StartAction::SpecialLink { account, code, result })
            },
            StartParameter::Referral(referrer_id) => match self.db.link_referral(referrer_id, user_id).await {
                Ok(Some(referral)) => {
                    info!("🎟️ Account {user_id} joined through a referral from {referrer_id}");
                    Ok(StartAction::Referred { account, referral })
                },
                Ok(None) => Ok(StartAction::Welcome(account)),
                Err(e) => {
                    debug!("🎟️ Referral of {user_id} by {referrer_id} ignored. {e}");
                    Ok(StartAction::Welcome(account))
                },
            },
            StartParameter::None => Ok(StartAction::Welcome(account)),
        }
    }
}
