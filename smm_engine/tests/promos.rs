use futures_util::future::join_all;
use smm_engine::{
    db_types::{Currency, ExchangeRate, Money, NewPromoCode, PromoType, Redemption},
    events::EventProducers,
    traits::{ExchangeRates, PromoError, PromoManagement},
    LedgerApi,
    PromoApi,
    StartAction,
};

use crate::support::prepare_env::{fresh_database, tear_down};

mod support;

#[tokio::test]
async fn fixed_code_credits_converted_amount_once() {
    let db = fresh_database().await;
    db.set_exchange_rate(&ExchangeRate::new(Currency::Rub, 100.0)).await.unwrap();
    let api = PromoApi::new(db.clone(), EventProducers::default());
    api.create_promo_code(NewPromoCode::new("WELCOME", 250.0, 10, PromoType::Fixed)).await.unwrap();

    let redemption = api.redeem(1, "WELCOME").await.unwrap();
    let Redemption::Credited(note) = redemption else { panic!("Expected a credit") };
    assert_eq!(note.credited, Money::try_from(2.5).unwrap());

    let err = api.redeem(1, "WELCOME").await.unwrap_err();
    assert!(matches!(err, PromoError::AlreadyUsed(_)));
    let promo = api.db().fetch_promo_code("WELCOME").await.unwrap().unwrap();
    assert_eq!(promo.activations, 1);
    tear_down(db).await;
}

#[tokio::test]
async fn activation_cap_holds_under_concurrency() {
    let db = fresh_database().await;
    db.set_exchange_rate(&ExchangeRate::new(Currency::Rub, 90.0)).await.unwrap();
    let api = PromoApi::new(db.clone(), EventProducers::default());
    api.create_promo_code(NewPromoCode::new("RUSH", 90.0, 3, PromoType::Fixed)).await.unwrap();

    let attempts = (1..=10).map(|user| api.redeem(user, "RUSH"));
    let results = join_all(attempts).await;
    let ok = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(ok, 3);
    assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| matches!(e, PromoError::Exhausted(_))));

    let promo = api.db().fetch_promo_code("RUSH").await.unwrap().unwrap();
    assert_eq!(promo.activations, 3);
    assert!(promo.is_exhausted());
    tear_down(db).await;
}

#[tokio::test]
async fn fixed_code_needs_an_exchange_rate() {
    let db = fresh_database().await;
    let api = PromoApi::new(db.clone(), EventProducers::default());
    api.create_promo_code(NewPromoCode::new("NORATE", 100.0, 1, PromoType::Fixed)).await.unwrap();
    let err = api.redeem(1, "NORATE").await.unwrap_err();
    assert!(matches!(err, PromoError::ExchangeRateUnavailable));
    // Nothing was consumed
    let promo = api.db().fetch_promo_code("NORATE").await.unwrap().unwrap();
    assert_eq!(promo.activations, 0);
    assert!(matches!(api.redeem(1, "NOPE").await, Err(PromoError::NotFound(_))));
    tear_down(db).await;
}

#[tokio::test]
async fn discount_code_boosts_next_top_up() {
    let db = fresh_database().await;
    let promos = PromoApi::new(db.clone(), EventProducers::default());
    let ledger = LedgerApi::new(db.clone());
    promos.create_promo_code(NewPromoCode::new("BOOST20", 20.0, 5, PromoType::Discount)).await.unwrap();

    let redemption = promos.redeem(42, "BOOST20").await.unwrap();
    assert_eq!(redemption, Redemption::Armed { percent: 20.0 });
    assert_eq!(db.armed_promo_codes(42).await.unwrap().len(), 1);

    let note = ledger.top_up(42, Money::from_units(10)).await.unwrap();
    assert_eq!(note.bonus, Money::from_units(2));
    assert_eq!(note.credited, Money::from_units(12));
    assert!(db.armed_promo_codes(42).await.unwrap().is_empty());

    // The discount is spent
    let note = ledger.top_up(42, Money::from_units(10)).await.unwrap();
    assert_eq!(note.bonus, Money::default());
    tear_down(db).await;
}

#[tokio::test]
async fn special_links_and_start_parameters() {
    let db = fresh_database().await;
    db.set_exchange_rate(&ExchangeRate::new(Currency::Rub, 100.0)).await.unwrap();
    let api = PromoApi::new(db.clone(), EventProducers::default());
    let (promo, link) = api.create_special_link("spring", 500.0, 2, "https://t.me/smm_bot").await.unwrap();
    assert_eq!(promo.code, "spring_");
    assert_eq!(promo.promo_type, PromoType::Fixed);
    assert_eq!(link, "https://t.me/smm_bot?start=spring_");

    match api.handle_start(10, "bob", 0, "spring_").await.unwrap() {
        StartAction::SpecialLink { account, code, result } => {
            assert_eq!(code, "spring_");
            assert!(result.is_ok());
            assert_eq!(account.balance, Money::from_units(5));
        },
        a => panic!("Unexpected start action: {a:?}"),
    }

    match api.handle_start(11, "dave", 0, "10").await.unwrap() {
        StartAction::Referred { referral, .. } => assert_eq!(referral.referrer_id, 10),
        a => panic!("Unexpected start action: {a:?}"),
    }
    // Self-referral falls back to a plain welcome
    assert!(matches!(api.handle_start(12, "erin", 0, "12").await.unwrap(), StartAction::Welcome(_)));
    assert!(matches!(api.handle_start(13, "fay", 0, "").await.unwrap(), StartAction::Welcome(_)));
    tear_down(db).await;
}
