use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
};

use log::*;
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
        PaymentNotification,
        PaymentProvider,
        PromoType,
    },
    events::{EventHandlers, EventHooks},
    traits::{ExchangeRates, OrderManagement},
    OrderReconcilerApi,
    PaymentFlowApi,
    PaymentRequest,
    PromoApi,
};

use crate::support::{
    prepare_env::{fresh_database, tear_down},
    upstream::FakeCheckout,
};

mod support;

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

#[tokio::test]
async fn hooks_fire_once_per_committed_effect() {
    let db = fresh_database().await;
    db.set_exchange_rate(&ExchangeRate::new(Currency::Rub, 100.0)).await.unwrap();
    let settled = HookCalled::default();
    let refunded = HookCalled::default();
    let redeemed = HookCalled::default();

    let mut hooks = EventHooks::default();
    let s = settled.clone();
    let r = refunded.clone();
    let p = redeemed.clone();
    hooks
        .on_payment_settled(move |ev| {
            info!("🪝️ Payment settled: {}", ev.payment.reference);
            s.called();
            Box::pin(async {})
        })
        .on_order_refunded(move |ev| {
            info!("🪝️ Order refunded: {}", ev.order.order_id);
            r.called();
            Box::pin(async {})
        })
        .on_promo_redeemed(move |ev| {
            info!("🪝️ Promo redeemed: {}", ev.code);
            p.called();
            Box::pin(async {})
        });
    let handlers = EventHandlers::new(16, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let payments = PaymentFlowApi::new(db.clone(), producers.clone());
    let checkout = FakeCheckout { provider: PaymentProvider::Cryptomus, fail: false };
    let request = PaymentRequest { chat_id: 1, amount: 10.0, currency: Currency::Usd };
    let payment = payments.create_payment(&checkout, request).await.unwrap();
    payments.process_notification(PaymentNotification::paid(&payment.reference)).await.unwrap();
    payments.process_notification(PaymentNotification::paid(&payment.reference)).await.unwrap();

    db.insert_order(NewOrder {
        order_id: OrderId(77),
        user_id: 1,
        service_id: "101".into(),
        service_type: "default".into(),
        link: "https://t.me/channel".into(),
        quantity: 1000,
        cost: Money::from_units(2),
    })
    .await
    .unwrap();
    let reconciler = OrderReconcilerApi::new(db.clone(), producers.clone());
    let report = OrderStatusReport {
        order_id: OrderId(77),
        status: OrderStatusType::Canceled,
        charge: Money::from_units(2),
        start_count: 0,
        remains: 1000,
    };
    reconciler.reconcile(&[report.clone()]).await;
    reconciler.reconcile(&[report]).await;

    let promos = PromoApi::new(db.clone(), producers);
    promos.create_promo_code(NewPromoCode::new("GIFT", 100.0, 5, PromoType::Fixed)).await.unwrap();
    promos.redeem(1, "GIFT").await.unwrap();
    let _ = promos.redeem(1, "GIFT").await;

    drop(payments);
    drop(reconciler);
    drop(promos);
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(settled.count(), 1);
    assert_eq!(refunded.count(), 1);
    assert_eq!(redeemed.count(), 1);
    tear_down(db).await;
}
