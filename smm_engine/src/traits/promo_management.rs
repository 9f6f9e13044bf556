use thiserror::Error;

use crate::{
    db_types::{NewPromoCode, PromoCode, Redemption, UsedPromoCode},
    traits::LedgerError,
};

#[derive(Debug, Clone, Error)]
pub enum PromoError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Promo code {0} does not exist")]
    NotFound(String),
    #[error("Promo code {0} has no activations left")]
    Exhausted(String),
    #[error("Promo code {0} has already been redeemed by this account")]
    AlreadyUsed(String),
    #[error("Promo code {0} already exists")]
    AlreadyExists(String),
    #[error("Invalid promo code: {0}")]
    InvalidPromoCode(String),
    #[error("No exchange rate is available to value the fixed promo code")]
    ExchangeRateUnavailable,
    #[error("{0}")]
    LedgerError(#[from] LedgerError),
}

impl From<sqlx::Error> for PromoError {
    fn from(e: sqlx::Error) -> Self {
        PromoError::DatabaseError(e.to_string())
    }
}

#[allow(async_fn_in_trait)]
pub trait PromoManagement {
    /// Stores a new promo code. Fails with [`PromoError::AlreadyExists`] if the code is taken.
    async fn create_promo_code(&self, code: NewPromoCode) -> Result<PromoCode, PromoError>;

    async fn fetch_promo_code(&self, code: &str) -> Result<Option<PromoCode>, PromoError>;

    /// Redeems `code` for the account in a single transaction.
    ///
    /// * The code must exist ([`PromoError::NotFound`]) and have activations left ([`PromoError::Exhausted`]).
    /// * The account must not have redeemed it before ([`PromoError::AlreadyUsed`]).
    /// * Fixed codes credit `discount / rate` immediately, using the latest secondary-currency rate.
    /// * Discount codes are armed, and boost the next top-up.
    ///
    /// The activation counter is incremented with a conditional update, so the cap holds under concurrent redemptions.
    async fn redeem_promo_code(&self, user_id: i64, code: &str) -> Result<Redemption, PromoError>;

    /// Discount codes the account has redeemed but not yet consumed, oldest first.
    async fn armed_promo_codes(&self, user_id: i64) -> Result<Vec<UsedPromoCode>, PromoError>;
}
