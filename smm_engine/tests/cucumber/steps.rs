use std::str::FromStr;

use cucumber::{given, then, when};
use smm_engine::{
    db_types::{
        Currency,
        ExchangeRate,
        Money,
        NewOrder,
        NewPromoCode,
        OrderId,
        OrderStatusReport,
        OrderStatusType,
        PromoType,
        Redemption,
        Service,
    },
    traits::{CatalogManagement, ExchangeRates, LedgerManagement, OrderManagement, PromoError},
};

use crate::cucumber::StoreWorld;

fn money(amount: f64) -> Money {
    Money::try_from(amount).expect("Not a valid amount")
}

fn currency(code: &str) -> Currency {
    Currency::from_str(code).expect("Not a valid currency")
}

#[given(expr = "the {word} exchange rate is {float}")]
async fn set_rate(world: &mut StoreWorld, code: String, rate: f64) {
    world.db().set_exchange_rate(&ExchangeRate::new(currency(&code), rate)).await.expect("Error setting exchange rate");
}

#[given(expr = "a storefront markup of {float}%")]
async fn set_markup(world: &mut StoreWorld, markup: f64) {
    world.markup_percent = markup;
}

#[given(expr = "service {string} costs {float} USD per 1000")]
async fn add_service(world: &mut StoreWorld, service_id: String, rate: f64) {
    let service = Service {
        service_id: service_id.clone(),
        name: format!("Service {service_id}"),
        category_id: "test".into(),
        service_type: "default".into(),
        rate: money(rate),
        min_quantity: 10,
        max_quantity: 100_000,
    };
    world.db().upsert_service(&service).await.expect("Error saving service");
}

#[given(expr = "account {int} exists")]
async fn open_account(world: &mut StoreWorld, user_id: i64) {
    world.ledger().open_account(user_id, &format!("user{user_id}"), 0).await.expect("Error opening account");
}

#[given(expr = "account {int} prefers {word}")]
async fn prefer_currency(world: &mut StoreWorld, user_id: i64, code: String) {
    world.ledger().open_account(user_id, "", 0).await.expect("Error opening account");
    world.ledger().set_currency(user_id, currency(&code)).await.expect("Error setting currency");
}

#[given(expr = "account {int} was referred by account {int}")]
async fn referred_by(world: &mut StoreWorld, referred: i64, referrer: i64) {
    let referral = world.ledger().link_referral(referrer, referred).await.expect("Error linking referral");
    assert!(referral.is_some(), "Account {referred} had already been referred");
}

#[given(expr = "account {int} placed order {int} costing {float} USD")]
async fn existing_order(world: &mut StoreWorld, user_id: i64, order_id: i64, cost: f64) {
    let order = NewOrder {
        order_id: OrderId(order_id),
        user_id,
        service_id: "1".into(),
        service_type: "default".into(),
        link: "https://t.me/example".into(),
        quantity: 1000,
        cost: money(cost),
    };
    world.db().insert_order(order).await.expect("Error saving order");
}

#[given(expr = "a fixed promo code {string} worth {float} with {int} activations")]
async fn fixed_promo(world: &mut StoreWorld, code: String, discount: f64, max: i64) {
    let code = NewPromoCode::new(code, discount, max, PromoType::Fixed);
    world.promos().create_promo_code(code).await.expect("Error creating promo code");
}

#[when(expr = "the provider reports order {int} as {word} with charge {float} USD and {int} remaining")]
async fn provider_report(world: &mut StoreWorld, order_id: i64, status: String, charge: f64, remains: i64) {
    world.pending_reports.push(OrderStatusReport {
        order_id: OrderId(order_id),
        status: OrderStatusType::normalize(&status),
        charge: money(charge),
        start_count: 0,
        remains,
    });
}

#[when(expr = "reconciliation runs {int} times")]
async fn run_reconciliation(world: &mut StoreWorld, times: usize) {
    let reconciler = world.reconciler();
    for _ in 0..times {
        let report = reconciler.reconcile(&world.pending_reports).await;
        assert_eq!(report.failed, 0, "Reconciliation failed: {report}");
    }
}

#[when(expr = "account {int} asks for a quote of {int} units of service {string}")]
async fn request_quote(world: &mut StoreWorld, user_id: i64, quantity: i64, service_id: String) {
    let account = world.db().fetch_account(user_id).await.expect("Error fetching account").expect("No account");
    let quote = world.purchases().quote(&service_id, quantity, account.currency).await.expect("Error quoting");
    world.last_quote = Some(quote);
}

#[when(expr = "account {int} redeems promo code {string}")]
async fn redeem(world: &mut StoreWorld, user_id: i64, code: String) {
    let result = world.promos().redeem(user_id, &code).await;
    world.last_redemption = Some(result);
}

#[when(expr = "account {int} tops up {float} USD")]
async fn top_up(world: &mut StoreWorld, user_id: i64, amount: f64) {
    world.ledger().top_up(user_id, money(amount)).await.expect("Error topping up");
}

#[then(expr = "account {int} has a balance of {float} USD")]
async fn check_balance(world: &mut StoreWorld, user_id: i64, amount: f64) {
    let account = world.db().fetch_account(user_id).await.expect("Error fetching account").expect("No account");
    assert_eq!(account.balance, money(amount), "Balance of account {user_id} is incorrect");
}

#[then(expr = "order {int} has been refunded {float} USD")]
async fn check_refund(world: &mut StoreWorld, order_id: i64, amount: f64) {
    let marker = world.db().fetch_refund_marker(OrderId(order_id)).await.expect("Error fetching refund");
    let marker = marker.expect("Order was not refunded");
    assert_eq!(marker.amount, money(amount));
}

#[then(expr = "the quoted price is {float} {word}")]
async fn check_quote(world: &mut StoreWorld, price: f64, code: String) {
    let quote = world.last_quote.as_ref().expect("No quote was requested");
    assert_eq!(quote.currency, currency(&code));
    assert!((quote.display_price - price).abs() < 1e-6, "Quoted {} but expected {price}", quote.display_price);
}

#[then(expr = "the redemption credits {float} USD")]
async fn check_credit(world: &mut StoreWorld, amount: f64) {
    match world.last_redemption.as_ref().expect("No redemption attempted") {
        Ok(Redemption::Credited(note)) => assert_eq!(note.credited, money(amount)),
        other => panic!("Expected a credit, got {other:?}"),
    }
}

#[then("the redemption is rejected as already used")]
async fn check_already_used(world: &mut StoreWorld) {
    let result = world.last_redemption.as_ref().expect("No redemption attempted");
    assert!(matches!(result, Err(PromoError::AlreadyUsed(_))), "Unexpected result: {result:?}");
}

#[then(expr = "account {int} has earned {float} USD from referrals")]
async fn check_referral_earnings(world: &mut StoreWorld, referrer: i64, amount: f64) {
    let stats = world.ledger().referral_stats(referrer).await.expect("Error fetching referral stats");
    assert_eq!(stats.total_earned, money(amount));
}
