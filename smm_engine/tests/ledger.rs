use futures_util::future::join_all;
use smm_engine::{
    db_types::{CreditKind, Money},
    traits::{LedgerError, LedgerManagement},
    LedgerApi,
};

use crate::support::prepare_env::{fresh_database, tear_down};

mod support;

#[tokio::test]
async fn concurrent_debits_never_overdraw() {
    let db = fresh_database().await;
    let api = LedgerApi::new(db.clone());
    api.top_up(1, Money::from_units(10)).await.expect("Error topping up");

    let debits = (0..20).map(|_| api.debit(1, Money::from_units(1)));
    let results = join_all(debits).await;
    let ok = results.iter().filter(|r| r.is_ok()).count();
    let short = results.iter().filter(|r| matches!(r, Err(LedgerError::InsufficientFunds { .. }))).count();
    assert_eq!(ok, 10);
    assert_eq!(short, 10);

    let account = api.account(1).await.unwrap().unwrap();
    assert_eq!(account.balance, Money::default());
    tear_down(db).await;
}

#[tokio::test]
async fn debit_reports_available_balance() {
    let db = fresh_database().await;
    let api = LedgerApi::new(db.clone());
    api.top_up(7, Money::from_units(2)).await.unwrap();
    let err = api.debit(7, Money::from_units(3)).await.unwrap_err();
    match err {
        LedgerError::InsufficientFunds { account, requested, available } => {
            assert_eq!(account, 7);
            assert_eq!(requested, Money::from_units(3));
            assert_eq!(available, Money::from_units(2));
        },
        e => panic!("Unexpected error: {e}"),
    }
    assert!(matches!(api.debit(7, Money::default()).await, Err(LedgerError::InvalidAmount(_))));
    tear_down(db).await;
}

#[tokio::test]
async fn referrer_earns_commission_on_top_ups_only() {
    let db = fresh_database().await;
    let api = LedgerApi::new(db.clone());
    api.open_account(100, "alice", 0).await.unwrap();
    let referral = api.link_referral(100, 200).await.unwrap();
    assert!(referral.is_some());
    // A second referral for the same account is ignored
    api.open_account(300, "carol", 0).await.unwrap();
    assert!(api.link_referral(300, 200).await.unwrap().is_none());

    let note = api.top_up(200, Money::from_units(20)).await.unwrap();
    assert_eq!(note.credited, Money::from_units(20));
    assert_eq!(note.commission, Money::from_units(2));
    assert_eq!(note.referrer, Some(100));

    let refund = api.credit(200, Money::from_units(5), CreditKind::Refund).await.unwrap();
    assert_eq!(refund.commission, Money::default());

    let alice = api.account(100).await.unwrap().unwrap();
    assert_eq!(alice.balance, Money::from_units(2));
    let stats = api.referral_stats(100).await.unwrap();
    assert_eq!(stats.referred_count, 1);
    assert_eq!(stats.total_earned, Money::from_units(2));
    tear_down(db).await;
}

#[tokio::test]
async fn invalid_referrals_are_rejected() {
    let db = fresh_database().await;
    assert!(matches!(db.link_referral(5, 5).await, Err(LedgerError::ReferralRejected(_))));
    assert!(matches!(db.link_referral(999, 5).await, Err(LedgerError::ReferralRejected(_))));
    assert!(db.fetch_referral(5).await.unwrap().is_none());
    tear_down(db).await;
}
