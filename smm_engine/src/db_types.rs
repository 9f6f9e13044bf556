use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::{debug, error};
use serde::{Deserialize, Serialize};
pub use smm_common::Money;
use smm_common::Secret;
use sqlx::{sqlite::SqliteRow, FromRow, Row, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------       Currency        ---------------------------------------------------------
/// Display currency preference for an account. Balances are always held in the base currency (USD).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Rub,
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Currency::Usd => write!(f, "USD"),
            Currency::Rub => write!(f, "RUB"),
        }
    }
}

impl FromStr for Currency {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::Usd),
            "RUB" => Ok(Self::Rub),
            s => Err(ConversionError(format!("Unknown currency: {s}"))),
        }
    }
}

impl Currency {
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Rub => "₽",
        }
    }
}

//--------------------------------------      UserAccount      ---------------------------------------------------------
#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserAccount {
    pub user_id: i64,
    pub user_name: String,
    pub channel_id: i64,
    pub balance: Money,
    pub currency: Currency,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       CreditKind      ---------------------------------------------------------
/// The reason for a ledger credit. Top-ups and promo bonuses attract armed discount bonuses and referral commission.
/// Refunds return the customer's own money and attract neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditKind {
    TopUp,
    PromoBonus,
    Refund,
}

impl CreditKind {
    pub fn earns_bonuses(&self) -> bool {
        !matches!(self, CreditKind::Refund)
    }
}

impl Display for CreditKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreditKind::TopUp => write!(f, "top-up"),
            CreditKind::PromoBonus => write!(f, "promo bonus"),
            CreditKind::Refund => write!(f, "refund"),
        }
    }
}

/// The result of a ledger credit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CreditNote {
    pub user_id: i64,
    /// The total amount added to the account, including any discount bonus
    pub credited: Money,
    /// The portion of `credited` that came from an armed discount promo code
    pub bonus: Money,
    /// Commission paid to the referrer, if the account was referred
    pub commission: Money,
    pub referrer: Option<i64>,
}

//--------------------------------------        Referral       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct Referral {
    pub id: i64,
    pub referrer_id: i64,
    pub referred_id: i64,
    pub amount_earned: Money,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, FromRow, Serialize, PartialEq, Eq)]
pub struct ReferralStats {
    pub referred_count: i64,
    pub total_earned: Money,
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// Accepted by the fulfilment provider but not started, or in an unrecognised state.
    #[default]
    Pending,
    InProgress,
    /// Finished, but only part of the quantity was delivered. The undelivered remainder is refunded.
    Partial,
    Completed,
    /// Cancelled upstream. The full cost is refunded.
    Canceled,
}

impl OrderStatusType {
    /// Any status that isn't recognised is treated as `Pending`.
    pub fn normalize(status: &str) -> Self {
        status.parse().unwrap_or_else(|_| {
            debug!("Unrecognised upstream order status '{status}'. Treating it as PENDING");
            OrderStatusType::Pending
        })
    }

    pub fn is_refundable(&self) -> bool {
        matches!(self, OrderStatusType::Partial | OrderStatusType::Canceled)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "PENDING"),
            OrderStatusType::InProgress => write!(f, "IN_PROGRESS"),
            OrderStatusType::Partial => write!(f, "PARTIAL"),
            OrderStatusType::Completed => write!(f, "COMPLETED"),
            OrderStatusType::Canceled => write!(f, "CANCELED"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "PARTIAL" => Ok(Self::Partial),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELED" => Ok(Self::Canceled),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to PENDING");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
/// The order id assigned by the upstream fulfilment provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub i64);

impl From<i64> for OrderId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub user_id: i64,
    pub service_id: String,
    pub service_type: String,
    pub link: String,
    pub quantity: i64,
    /// What the customer paid, in base currency
    pub cost: Money,
    pub status: OrderStatusType,
    pub charge: Money,
    pub start_count: i64,
    pub remains: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub order_id: OrderId,
    pub user_id: i64,
    pub service_id: String,
    pub service_type: String,
    pub link: String,
    pub quantity: i64,
    pub cost: Money,
}

/// The state of an order as reported by the upstream fulfilment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderStatusReport {
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub charge: Money,
    pub start_count: i64,
    pub remains: i64,
}

impl OrderStatusReport {
    /// True if any of the tracked progress fields differ from the stored order.
    pub fn differs_from(&self, order: &Order) -> bool {
        self.status != order.status ||
            self.charge != order.charge ||
            self.start_count != order.start_count ||
            self.remains != order.remains
    }

    /// The amount to refund when an order ends up in this state.
    /// `CANCELED` refunds the full cost, `PARTIAL` refunds `remains / 1000 * charge`.
    pub fn refund_amount(&self, order: &Order) -> Option<Money> {
        match self.status {
            OrderStatusType::Canceled => Some(order.cost),
            OrderStatusType::Partial => Some(self.charge.mul_div(self.remains, 1000)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct RefundMarker {
    pub order_id: OrderId,
    pub amount: Money,
    pub refunded_at: DateTime<Utc>,
}

//--------------------------------------        Service        ---------------------------------------------------------
/// A catalog entry mirrored from the marketplace. Only the fields needed for pricing are kept.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct Service {
    pub service_id: String,
    pub name: String,
    pub category_id: String,
    pub service_type: String,
    /// Price per 1000 units, in base currency
    pub rate: Money,
    pub min_quantity: i64,
    pub max_quantity: i64,
}

//--------------------------------------       PromoCode       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PromoType {
    /// Credits a flat amount, denominated in the secondary currency, on redemption
    Fixed,
    /// Boosts the next top-up by a percentage
    Discount,
}

impl Display for PromoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PromoType::Fixed => write!(f, "fixed"),
            PromoType::Discount => write!(f, "discount"),
        }
    }
}

impl FromStr for PromoType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "discount" => Ok(Self::Discount),
            s => Err(ConversionError(format!("Invalid promo code type: {s}"))),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct PromoCode {
    pub code: String,
    /// Face value in the secondary currency for `fixed` codes, or a percentage for `discount` codes
    pub discount: f64,
    pub max_activations: i64,
    pub activations: i64,
    pub promo_type: PromoType,
}

impl PromoCode {
    pub fn is_exhausted(&self) -> bool {
        self.activations >= self.max_activations
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPromoCode {
    pub code: String,
    pub discount: f64,
    pub max_activations: i64,
    pub promo_type: PromoType,
}

impl NewPromoCode {
    pub fn new<S: Into<String>>(code: S, discount: f64, max_activations: i64, promo_type: PromoType) -> Self {
        Self { code: code.into(), discount, max_activations, promo_type }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, PartialEq, Eq)]
pub struct UsedPromoCode {
    pub user_id: i64,
    pub promo_code: String,
    /// `false` while a discount code is armed and waiting for the next top-up
    pub used: bool,
}

/// The effect of a successful promo code redemption
#[derive(Debug, Clone, PartialEq)]
pub enum Redemption {
    /// A fixed code credited the account immediately
    Credited(CreditNote),
    /// A discount code is armed and will boost the next top-up by `percent`
    Armed { percent: f64 },
}

//--------------------------------------       Payments        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentProvider {
    Cryptomus,
    Aaio,
    Payok,
}

impl Display for PaymentProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentProvider::Cryptomus => write!(f, "cryptomus"),
            PaymentProvider::Aaio => write!(f, "aaio"),
            PaymentProvider::Payok => write!(f, "payok"),
        }
    }
}

impl PaymentProvider {
    /// The prefix used when generating payment references for this provider
    pub fn reference_prefix(&self) -> &'static str {
        match self {
            PaymentProvider::Cryptomus => "order",
            PaymentProvider::Aaio | PaymentProvider::Payok => "payment",
        }
    }

    /// `<prefix>_<chat_id>_<unix millis>_<nonce>`. The nonce keeps references from the same chat and millisecond apart,
    /// and AAIO and PayOK share a prefix.
    pub fn new_reference(&self, chat_id: i64, timestamp_ms: i64, nonce: &str) -> String {
        format!("{}_{chat_id}_{timestamp_ms}_{nonce}", self.reference_prefix())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Check,
    Paid,
    Cancel,
    Fail,
}

impl PaymentStatus {
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Check => write!(f, "check"),
            PaymentStatus::Paid => write!(f, "paid"),
            PaymentStatus::Cancel => write!(f, "cancel"),
            PaymentStatus::Fail => write!(f, "fail"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    /// Provider status strings. `success` is the aaio/payok spelling of `paid`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "check" => Ok(Self::Check),
            "paid" | "paid_over" | "success" => Ok(Self::Paid),
            "cancel" => Ok(Self::Cancel),
            "fail" => Ok(Self::Fail),
            s => Err(ConversionError(format!("Unknown payment status: {s}"))),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct Payment {
    pub reference: String,
    pub user_id: i64,
    pub amount: Money,
    pub url: String,
    pub status: PaymentStatus,
    pub provider: PaymentProvider,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub reference: String,
    pub user_id: i64,
    pub amount: Money,
    pub url: String,
    pub provider: PaymentProvider,
}

/// A verified provider callback, reduced to the fields the gateway acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentNotification {
    pub reference: String,
    pub status: PaymentStatus,
    pub amount: Option<Money>,
}

impl PaymentNotification {
    pub fn paid<S: Into<String>>(reference: S) -> Self {
        Self { reference: reference.into(), status: PaymentStatus::Paid, amount: None }
    }
}

//--------------------------------------    ExchangeRate       ---------------------------------------------------------
/// How many units of `currency` one unit of the base currency buys.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct ExchangeRate {
    pub currency: Currency,
    pub rate: f64,
    pub updated_at: DateTime<Utc>,
}

impl ExchangeRate {
    pub fn new(currency: Currency, rate: f64) -> Self {
        Self { currency, rate, updated_at: Utc::now() }
    }
}

//--------------------------------------      Idempotency      ---------------------------------------------------------
/// The kinds of financial side effect that must be applied at most once per external reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type)]
#[sqlx(rename_all = "snake_case")]
pub enum OperationKind {
    OrderRefund,
    PaymentCredit,
    PromoRedemption,
}

impl Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationKind::OrderRefund => write!(f, "order_refund"),
            OperationKind::PaymentCredit => write!(f, "payment_credit"),
            OperationKind::PromoRedemption => write!(f, "promo_redemption"),
        }
    }
}

//--------------------------------------        Tenants        ---------------------------------------------------------
/// Opaque identifier for a tenant bot. Used as the supervisor's map key so that tokens never have to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct TenantId(pub i64);

impl Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tenant-{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Tenant {
    pub id: TenantId,
    pub owner_id: i64,
    pub owner_name: String,
    pub token: Secret<String>,
    pub bot_name: String,
    pub running: bool,
    pub balance: Money,
    pub lease_owner: Option<String>,
    /// Unix time in milliseconds
    pub lease_expires_at: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for Tenant {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let token: String = row.try_get("token")?;
        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            owner_name: row.try_get("owner_name")?,
            token: Secret::new(token),
            bot_name: row.try_get("bot_name")?,
            running: row.try_get("running")?,
            balance: row.try_get("balance")?,
            lease_owner: row.try_get("lease_owner")?,
            lease_expires_at: row.try_get("lease_expires_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewTenant {
    pub owner_id: i64,
    pub owner_name: String,
    pub token: Secret<String>,
    pub bot_name: String,
}

/// What the bot transport reports about a validated token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub username: String,
}

/// An inbound chat message delivered to a tenant's worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundUpdate {
    pub update_id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub user_name: String,
    pub text: String,
}
