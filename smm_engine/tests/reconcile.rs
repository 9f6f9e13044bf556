use smm_engine::{
    db_types::{Money, NewOrder, OrderId, OrderStatusReport, OrderStatusType},
    events::EventProducers,
    traits::{LedgerManagement, OrderManagement},
    OrderReconcilerApi,
    ReconcileError,
};

use crate::support::{
    prepare_env::{fresh_database, tear_down},
    upstream::FakeUpstream,
};

mod support;

fn new_order(order_id: i64, user_id: i64, cost: Money) -> NewOrder {
    NewOrder {
        order_id: OrderId(order_id),
        user_id,
        service_id: "101".into(),
        service_type: "default".into(),
        link: "https://instagram.com/example".into(),
        quantity: 1000,
        cost,
    }
}

fn report(order_id: i64, status: OrderStatusType, charge: Money, remains: i64) -> OrderStatusReport {
    OrderStatusReport { order_id: OrderId(order_id), status, charge, start_count: 120, remains }
}

#[tokio::test]
async fn cancelled_order_is_refunded_exactly_once() {
    let db = fresh_database().await;
    db.insert_order(new_order(1, 7, Money::from(2_200_000))).await.unwrap();
    let api = OrderReconcilerApi::new(db.clone(), EventProducers::default());
    let upstream =
        FakeUpstream::with_reports(vec![report(1, OrderStatusType::Canceled, Money::from(2_200_000), 1000)]);

    let first = api.run_pass(&upstream).await.unwrap();
    assert_eq!(first.refunded, 1);
    assert_eq!(first.refunded_amount, Money::from(2_200_000));
    let second = api.run_pass(&upstream).await.unwrap();
    assert_eq!(second.refunded, 0);
    assert_eq!(second.already_refunded, 1);

    let account = db.fetch_account(7).await.unwrap().unwrap();
    assert_eq!(account.balance, Money::from(2_200_000));
    let marker = db.fetch_refund_marker(OrderId(1)).await.unwrap().unwrap();
    assert_eq!(marker.amount, Money::from(2_200_000));
    tear_down(db).await;
}

#[tokio::test]
async fn partial_order_refunds_the_undelivered_share() {
    let db = fresh_database().await;
    db.insert_order(new_order(2, 8, Money::from(40_000))).await.unwrap();
    let api = OrderReconcilerApi::new(db.clone(), EventProducers::default());
    // 500 of 1000 undelivered, at a charge of $0.02 per 1000
    let reports = vec![report(2, OrderStatusType::Partial, Money::from(20_000), 500)];
    let summary = api.reconcile(&reports).await;
    assert_eq!(summary.refunded, 1);
    assert_eq!(summary.refunded_amount, Money::from(10_000));
    let order = db.fetch_order(OrderId(2)).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Partial);
    assert_eq!(order.remains, 500);
    tear_down(db).await;
}

#[tokio::test]
async fn progress_updates_and_unknown_orders() {
    let db = fresh_database().await;
    db.insert_order(new_order(3, 9, Money::from_units(1))).await.unwrap();
    let api = OrderReconcilerApi::new(db.clone(), EventProducers::default());
    let upstream = FakeUpstream::with_reports(vec![
        report(3, OrderStatusType::InProgress, Money::from_units(1), 400),
        report(404, OrderStatusType::Canceled, Money::from_units(1), 1000),
    ]);
    let summary = api.run_pass(&upstream).await.unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.unknown, 1);
    assert!(db.fetch_order(OrderId(404)).await.unwrap().is_none());

    let summary = api.run_pass(&upstream).await.unwrap();
    assert_eq!(summary.unchanged, 1);

    upstream.set_reports(vec![report(3, OrderStatusType::Completed, Money::from_units(1), 0)]);
    let summary = api.run_pass(&upstream).await.unwrap();
    assert_eq!(summary.updated, 1);
    assert_eq!(summary.refunded, 0);
    assert_eq!(db.fetch_account(9).await.unwrap().unwrap().balance, Money::default());
    tear_down(db).await;
}

#[tokio::test]
async fn upstream_failure_changes_nothing() {
    let db = fresh_database().await;
    db.insert_order(new_order(5, 10, Money::from_units(3))).await.unwrap();
    let api = OrderReconcilerApi::new(db.clone(), EventProducers::default());
    let upstream = FakeUpstream::with_reports(vec![report(5, OrderStatusType::Canceled, Money::from_units(3), 1000)]);
    upstream.set_offline(true);
    let err = api.run_pass(&upstream).await.unwrap_err();
    assert!(matches!(err, ReconcileError::UpstreamFetchError(_)));
    let order = db.fetch_order(OrderId(5)).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Pending);

    upstream.set_offline(false);
    let summary = api.run_pass(&upstream).await.unwrap();
    assert_eq!(summary.refunded, 1);
    tear_down(db).await;
}
