//! Turns chat messages into engine calls and renders the replies.
//!
//! One `UpdateHandler` is shared by every tenant worker. Workers feed it their own updates strictly in arrival order.
use std::{str::FromStr, sync::Arc};

use log::*;
use smm_common::Secret;
use smm_engine::{
    db_types::{Currency, InboundUpdate, NewPromoCode, PromoCode, PromoType, Redemption, Tenant, TenantId},
    traits::{BotTransport, LedgerError, OrderSource, PromoError, TenantError},
    LedgerApi,
    PromoApi,
    PurchaseApi,
    PurchaseError,
    SqliteDatabase,
    StartAction,
    TenantApi,
};

const HELP: &str = "Commands:\n\
/balance - show your balance\n\
/promo <code> - redeem a promo code\n\
/price <service> <quantity> - price an order\n\
/order <service> <quantity> <link> - place an order\n\
/currency <USD|RUB> - choose the currency prices are shown in\n\
/referral - your referral link and earnings\n\
/addbot <token> - run your own copy of this shop\n\
/mybots, /stopbot <id>, /startbot <id> - manage your bots\n\
/createpromo, /genpromo, /createurl - channel admins only";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Start(String),
    Balance,
    Promo(String),
    Price { service_id: String, quantity: i64 },
    Order { service_id: String, quantity: i64, link: String },
    Currency(String),
    Referral,
    AddBot(String),
    MyBots,
    StopBot(i64),
    StartBot(i64),
    CreatePromo { code: String, percent: f64, max_activations: i64 },
    GeneratePromo { percent: f64, max_activations: i64 },
    CreateUrl { name: String, amount: f64, max_activations: i64 },
    Help,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut parts = text.split_whitespace();
        let Some(command) = parts.next() else {
            return Ok(Command::Help);
        };
        // Group chats address commands as /cmd@bot_name
        let command = command.split('@').next().unwrap_or(command);
        let args = parts.collect::<Vec<_>>();
        let quantity = |s: &str| s.parse::<i64>().map_err(|_| format!("{s} is not a valid quantity"));
        let bot_id = |s: &str| s.parse::<i64>().map_err(|_| format!("{s} is not a bot id"));
        let positive = |s: &str| match s.parse::<f64>() {
            Ok(v) if v.is_finite() && v > 0.0 => Ok(v),
            _ => Err(format!("{s} must be a positive number")),
        };
        let activations = |s: &str| match s.parse::<i64>() {
            Ok(v) if v > 0 => Ok(v),
            _ => Err(format!("{s} is not a valid number of activations")),
        };
        match (command, args.as_slice()) {
            ("/start", []) => Ok(Command::Start(String::default())),
            ("/start", [param, ..]) => Ok(Command::Start(param.to_string())),
            ("/balance", _) => Ok(Command::Balance),
            ("/promo", [code]) => Ok(Command::Promo(code.to_string())),
            ("/promo", _) => Err("Usage: /promo <code>".into()),
            ("/price", [service, qty]) => {
                Ok(Command::Price { service_id: service.to_string(), quantity: quantity(qty)? })
            },
            ("/price", _) => Err("Usage: /price <service> <quantity>".into()),
            ("/order", [service, qty, link]) => {
                Ok(Command::Order { service_id: service.to_string(), quantity: quantity(qty)?, link: link.to_string() })
            },
            ("/order", _) => Err("Usage: /order <service> <quantity> <link>".into()),
            ("/currency", [c]) => Ok(Command::Currency(c.to_string())),
            ("/currency", _) => Err("Usage: /currency <USD|RUB>".into()),
            ("/referral", _) => Ok(Command::Referral),
            ("/addbot", [token]) => Ok(Command::AddBot(token.to_string())),
            ("/addbot", _) => Err("Usage: /addbot <token>".into()),
            ("/mybots", _) => Ok(Command::MyBots),
            ("/stopbot", [id]) => Ok(Command::StopBot(bot_id(id)?)),
            ("/startbot", [id]) => Ok(Command::StartBot(bot_id(id)?)),
            ("/createpromo", [code, percent, max]) => Ok(Command::CreatePromo {
                code: code.to_string(),
                percent: positive(percent)?,
                max_activations: activations(max)?,
            }),
            ("/createpromo", _) => Err("Usage: /createpromo <code> <percent> <activations>".into()),
            ("/genpromo", [percent, max]) => {
                Ok(Command::GeneratePromo { percent: positive(percent)?, max_activations: activations(max)? })
            },
            ("/genpromo", _) => Err("Usage: /genpromo <percent> <activations>".into()),
            ("/createurl", [name, amount, max]) => Ok(Command::CreateUrl {
                name: name.to_string(),
                amount: positive(amount)?,
                max_activations: activations(max)?,
            }),
            ("/createurl", _) => Err("Usage: /createurl <name> <amount> <activations>".into()),
            _ => Ok(Command::Help),
        }
    }
}

pub struct UpdateHandler {
    ledger: LedgerApi<SqliteDatabase>,
    promos: PromoApi<SqliteDatabase>,
    purchases: PurchaseApi<SqliteDatabase>,
    tenants: TenantApi<SqliteDatabase>,
    orders: Arc<dyn OrderSource>,
    transport: Arc<dyn BotTransport>,
    channel_id: i64,
    bot_link: String,
}

impl UpdateHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ledger: LedgerApi<SqliteDatabase>,
        promos: PromoApi<SqliteDatabase>,
        purchases: PurchaseApi<SqliteDatabase>,
        tenants: TenantApi<SqliteDatabase>,
        orders: Arc<dyn OrderSource>,
        transport: Arc<dyn BotTransport>,
        channel_id: i64,
        bot_link: &str,
    ) -> Self {
        let bot_link = bot_link.trim_end_matches('/').to_string();
        Self { ledger, promos, purchases, tenants, orders, transport, channel_id, bot_link }
    }

    /// Handles one update and sends the reply through the tenant's bot.
    pub async fn handle(&self, tenant: &Tenant, update: &InboundUpdate) {
        let Some(reply) = self.reply(tenant, update).await else {
            return;
        };
        if let Err(e) = self.transport.send_message(&tenant.token, update.chat_id, &reply).await {
            warn!("🤖️ {} could not reply to chat {}. {e}", tenant.id, update.chat_id);
        }
    }

    /// Works out the reply to an update. Updates without text get no reply.
    pub async fn reply(&self, tenant: &Tenant, update: &InboundUpdate) -> Option<String> {
        if update.text.trim().is_empty() {
            return None;
        }
        let command = match Command::from_str(&update.text) {
            Ok(c) => c,
            Err(usage) => return Some(usage),
        };
        trace!("🤖️ {} handling {command:?} from {}", tenant.id, update.user_id);
        let user_id = update.user_id;
        let reply = match command {
            Command::Start(param) => self.start(update, &param).await,
            Command::Balance => self.balance(user_id).await,
            Command::Promo(code) => self.promo(user_id, &code).await,
            Command::Price { service_id, quantity } => self.price(user_id, &service_id, quantity).await,
            Command::Order { service_id, quantity, link } => self.order(user_id, &service_id, quantity, &link).await,
            Command::Currency(c) => self.currency(user_id, &c).await,
            Command::Referral => self.referral(tenant, user_id).await,
            Command::AddBot(token) => self.add_bot(update, token).await,
            Command::MyBots => self.my_bots(user_id).await,
            Command::StopBot(id) => self.toggle_bot(user_id, TenantId(id), false).await,
            Command::StartBot(id) => self.toggle_bot(user_id, TenantId(id), true).await,
            Command::Help => HELP.to_string(),
            admin_command => {
                if !self.is_admin(tenant, user_id).await {
                    info!("🤖️ {user_id} is not an admin of {} and may not use {admin_command:?}", self.channel_id);
                    return Some("Only channel admins can do that.".into());
                }
                self.admin(tenant, admin_command).await
            },
        };
        Some(reply)
    }

    async fn start(&self, update: &InboundUpdate, param: &str) -> String {
        let action = match self.promos.handle_start(update.user_id, &update.user_name, self.channel_id, param).await {
            Ok(a) => a,
            Err(e) => return internal_error(e),
        };
        match action {
            StartAction::Welcome(account) => format!("Welcome, {}! Your balance is {}.\n\n{HELP}", account.user_name, account.balance),
            StartAction::Referred { account, referral } => format!(
                "Welcome, {}! You were invited by {}. Your balance is {}.\n\n{HELP}",
                account.user_name, referral.referrer_id, account.balance
            ),
            StartAction::SpecialLink { account, result: Ok(Redemption::Credited(note)), .. } => {
                format!("Welcome, {}! {} was added to your balance.", account.user_name, note.credited)
            },
            StartAction::SpecialLink { account, result: Ok(Redemption::Armed { percent }), .. } => {
                format!("Welcome, {}! Your next top-up gets {percent}% extra.", account.user_name)
            },
            StartAction::SpecialLink { account, result: Err(e), .. } => {
                format!("Welcome, {}! {}", account.user_name, promo_message(&e))
            },
        }
    }

    async fn balance(&self, user_id: i64) -> String {
        match self.ledger.account(user_id).await {
            Ok(Some(account)) => format!("Your balance is {}.", account.balance),
            Ok(None) => "You don't have an account yet. Send /start to open one.".into(),
            Err(e) => internal_error(e),
        }
    }

    async fn promo(&self, user_id: i64, code: &str) -> String {
        match self.promos.redeem(user_id, code).await {
            Ok(Redemption::Credited(note)) => format!("Promo code applied. {} was added to your balance.", note.credited),
            Ok(Redemption::Armed { percent }) => format!("Promo code applied. Your next top-up gets {percent}% extra."),
            Err(e) => promo_message(&e),
        }
    }

    async fn price(&self, user_id: i64, service_id: &str, quantity: i64) -> String {
        let currency = self.display_currency(user_id).await;
        match self.purchases.quote(service_id, quantity, currency).await {
            Ok(q) => format!(
                "{}: {} for {}{:.2}",
                q.service.name,
                q.quantity,
                q.currency.symbol(),
                q.display_price
            ),
            Err(e) => purchase_message(&e),
        }
    }

    async fn order(&self, user_id: i64, service_id: &str, quantity: i64, link: &str) -> String {
        let currency = self.display_currency(user_id).await;
        let quote = match self.purchases.quote(service_id, quantity, currency).await {
            Ok(q) => q,
            Err(e) => return purchase_message(&e),
        };
        match self.purchases.place_order(self.orders.as_ref(), user_id, &quote, link).await {
            Ok(order) => format!("Order {} placed. {} was taken from your balance.", order.order_id, order.cost),
            Err(e) => purchase_message(&e),
        }
    }

    async fn currency(&self, user_id: i64, currency: &str) -> String {
        let currency = match Currency::from_str(currency) {
            Ok(c) => c,
            Err(_) => return "Choose USD or RUB.".into(),
        };
        match self.ledger.set_currency(user_id, currency).await {
            Ok(_) => format!("Prices will be shown in {currency}."),
            Err(LedgerError::AccountNotFound(_)) => "Send /start to open an account first.".into(),
            Err(e) => internal_error(e),
        }
    }

    async fn referral(&self, tenant: &Tenant, user_id: i64) -> String {
        let link = format!("{}/{}?start={user_id}", self.bot_link, tenant.bot_name);
        match self.ledger.referral_stats(user_id).await {
            Ok(stats) => format!(
                "Your referral link: {link}\nPeople invited: {}\nEarned: {}",
                stats.referred_count, stats.total_earned
            ),
            Err(e) => internal_error(e),
        }
    }

    async fn add_bot(&self, update: &InboundUpdate, token: String) -> String {
        match self.tenants.register(self.transport.as_ref(), update.user_id, &update.user_name, Secret::new(token)).await {
            Ok(tenant) => format!("Bot @{} added as #{}. It will start in a moment.", tenant.bot_name, tenant.id.0),
            Err(TenantError::TenantLimitReached { limit, .. }) => format!("You can run at most {limit} bots."),
            Err(TenantError::TokenAlreadyRegistered) => "This bot is already registered.".into(),
            Err(TenantError::InvalidToken(_)) => "That token was rejected. Check it and try again.".into(),
            Err(TenantError::TransportUnavailable(_)) => "Could not check the token right now. Try again later.".into(),
            Err(e) => internal_error(e),
        }
    }

    async fn my_bots(&self, user_id: i64) -> String {
        match self.tenants.tenants_for_owner(user_id).await {
            Ok(bots) if bots.is_empty() => "You have no bots. Add one with /addbot <token>.".into(),
            Ok(bots) => bots
                .iter()
                .map(|t| format!("#{} @{} ({})", t.id.0, t.bot_name, if t.running { "running" } else { "stopped" }))
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => internal_error(e),
        }
    }

    async fn toggle_bot(&self, user_id: i64, id: TenantId, running: bool) -> String {
        let owned = match self.tenants.tenants_for_owner(user_id).await {
            Ok(bots) => bots.iter().any(|t| t.id == id),
            Err(e) => return internal_error(e),
        };
        if !owned {
            return format!("You have no bot #{}.", id.0);
        }
        let result = if running { self.tenants.resume(id).await } else { self.tenants.stop(id).await };
        match result {
            Ok(()) if running => format!("Bot #{} is starting.", id.0),
            Ok(()) => format!("Bot #{} stopped.", id.0),
            Err(e) => internal_error(e),
        }
    }

    async fn admin(&self, tenant: &Tenant, command: Command) -> String {
        let result = match command {
            Command::CreatePromo { code, percent, max_activations } => {
                let code = NewPromoCode::new(code, percent, max_activations, PromoType::Discount);
                self.promos.create_promo_code(code).await.map(|p| discount_created(&p))
            },
            Command::GeneratePromo { percent, max_activations } => self
                .promos
                .generate_promo_code(percent, max_activations, PromoType::Discount)
                .await
                .map(|p| discount_created(&p)),
            Command::CreateUrl { name, amount, max_activations } => {
                let bot_link = format!("{}/{}", self.bot_link, tenant.bot_name);
                self.promos.create_special_link(&name, amount, max_activations, &bot_link).await.map(|(promo, link)| {
                    format!(
                        "Special link for {}{:.2} with {} activations:\n{link}",
                        Currency::Rub.symbol(),
                        promo.discount,
                        promo.max_activations
                    )
                })
            },
            c => return internal_error(format!("{c:?} is not an admin command")),
        };
        result.unwrap_or_else(|e| promo_message(&e))
    }

    async fn is_admin(&self, tenant: &Tenant, user_id: i64) -> bool {
        match self.transport.is_chat_admin(&tenant.token, self.channel_id, user_id).await {
            Ok(admin) => admin,
            Err(e) => {
                warn!("🤖️ Could not check whether {user_id} administers {}. {e}", self.channel_id);
                false
            },
        }
    }

    async fn display_currency(&self, user_id: i64) -> Currency {
        match self.ledger.account(user_id).await {
            Ok(Some(account)) => account.currency,
            _ => Currency::default(),
        }
    }
}

fn promo_message(e: &PromoError) -> String {
    match e {
        PromoError::NotFound(_) => "That promo code doesn't exist.".into(),
        PromoError::Exhausted(_) => "That promo code has no activations left.".into(),
        PromoError::AlreadyUsed(_) => "You have already used that promo code.".into(),
        PromoError::AlreadyExists(code) => format!("Promo code {code} already exists."),
        PromoError::InvalidPromoCode(code) => format!("{code} is not a valid promo code name."),
        PromoError::LedgerError(LedgerError::AccountNotFound(_)) => "Send /start to open an account first.".into(),
        e => internal_error(e),
    }
}

fn discount_created(promo: &PromoCode) -> String {
    format!(
        "Promo code {} created: {}% extra on the next top-up, {} activations.",
        promo.code, promo.discount, promo.max_activations
    )
}

fn purchase_message(e: &PurchaseError) -> String {
    match e {
        PurchaseError::ServiceNotFound(s) => format!("Service {s} doesn't exist."),
        PurchaseError::PriceError(e) => e.to_string(),
        PurchaseError::InvalidLink(_) => "The link must start with http:// or https://".into(),
        PurchaseError::LedgerError(LedgerError::InsufficientFunds { available, .. }) => {
            format!("Not enough balance. You have {available}.")
        },
        PurchaseError::LedgerError(LedgerError::AccountNotFound(_)) => "Send /start to open an account first.".into(),
        PurchaseError::UpstreamError(_) => "The order could not be placed right now. Your balance was not charged.".into(),
        e => internal_error(e),
    }
}

fn internal_error<E: std::fmt::Display>(e: E) -> String {
    error!("🤖️ Could not handle a bot command. {e}");
    "Something went wrong. Please try again later.".into()
}
