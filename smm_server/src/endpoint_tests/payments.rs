use std::sync::Arc;

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use smm_engine::{
    db_types::{CreditNote, Currency, ExchangeRate, Money, NewPayment, Payment, PaymentProvider, PaymentStatus},
    events::EventProducers,
    traits::{ExchangeRateError, PaymentError, Settlement},
    PaymentFlowApi,
};

use super::{
    helpers::{get, post_form, post_json},
    mocks::{MockPaymentBackend, StaticLinks},
};
use crate::{
    data_objects::PaymentLinkResponse,
    routes::{
        health,
        AaioNotificationRoute,
        CreatePaymentAaioRoute,
        CreatePaymentPayokRoute,
        CreatePaymentRoute,
        PayokNotificationRoute,
        PaymentProviders,
        WebhookRoute,
    },
};

#[actix_web::test]
async fn health_check() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get("/health", configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "👍️\n");
}

#[actix_web::test]
async fn paid_webhook_settles_the_payment() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_json("/webhook", r#"{"order_id":"order_1_100","status":"paid","amount":"10.00"}"#, configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"reference":"order_1_100","status":"paid"}"#);
}

#[actix_web::test]
async fn repeated_paid_webhook_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_json("/webhook", r#"{"order_id":"order_1_200","status":"paid"}"#, configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"reference":"order_1_200","status":"paid"}"#);
}

#[actix_web::test]
async fn non_paid_webhook_records_the_status() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_json("/webhook", r#"{"order_id":"order_1_300","status":"cancel"}"#, configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"reference":"order_1_300","status":"cancel"}"#);
}

#[actix_web::test]
async fn webhook_for_unknown_payment() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_json("/webhook", r#"{"order_id":"order_9_999","status":"paid"}"#, configure).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("order_9_999 does not exist"), "{body}");
}

#[actix_web::test]
async fn malformed_webhooks_are_rejected() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_json("/webhook", r#"{"status":"paid"}"#, configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.starts_with(r#"{"error":"Payload deserialization error."#), "{body}");

    let (status, _) = post_json("/webhook", "not json", configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = post_json("/webhook", r#"{"order_id":"order_1_100","status":"refunded"}"#, configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Unknown payment status"), "{body}");

    let (status, _) = post_json("/webhook", r#"{"order_id":"  ","status":"paid"}"#, configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn webhook_with_unreadable_amount_is_rejected() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_json("/webhook", r#"{"order_id":"order_1_100","status":"paid","amount":"ten"}"#, configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("'ten' is not a valid amount"), "{body}");
}

#[actix_web::test]
async fn aaio_notification_uses_order_id() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_form("/aaio_notification", "order_id=order_1_100&amount=10", configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"reference":"order_1_100","status":"paid"}"#);
}

#[actix_web::test]
async fn payok_notification_uses_payment_id() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_form("/payok_notification", "payment_id=order_1_200", configure).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"reference":"order_1_200","status":"paid"}"#);

    let (status, body) = post_form("/payok_notification", "amount=10", configure).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Neither order_id nor payment_id"), "{body}");
}

#[actix_web::test]
async fn create_cryptomus_payment() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_json("/create_payment", r#"{"chat_id":42,"amount":10.0}"#, configure).await;
    assert_eq!(status, StatusCode::OK);
    let link: PaymentLinkResponse = serde_json::from_str(&body).unwrap();
    assert_eq!(link.status, "success");
    assert!(link.url.starts_with("https://pay.example/order_42_"), "{}", link.url);
}

#[actix_web::test]
async fn create_aaio_payment_in_roubles() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_json("/create_payment_aaio", r#"{"chat_id":42,"amount":900.0,"currency":"RUB"}"#, configure).await;
    assert_eq!(status, StatusCode::OK);
    let link: PaymentLinkResponse = serde_json::from_str(&body).unwrap();
    assert!(link.url.starts_with("https://pay.example/payment_42_"), "{}", link.url);
}

#[actix_web::test]
async fn back_to_back_payments_get_their_own_links() {
    let _ = env_logger::try_init().ok();
    let mut urls = Vec::new();
    for _ in 0..2 {
        let (status, body) = post_json("/create_payment", r#"{"chat_id":42,"amount":10.0}"#, configure).await;
        assert_eq!(status, StatusCode::OK);
        let link: PaymentLinkResponse = serde_json::from_str(&body).unwrap();
        urls.push(link.url);
    }
    assert_ne!(urls[0], urls[1]);
}

#[actix_web::test]
async fn create_payment_rejects_non_positive_amounts() {
    let _ = env_logger::try_init().ok();
    for amount in ["0", "-5"] {
        let body = format!(r#"{{"chat_id":42,"amount":{amount}}}"#);
        let (status, body) = post_json("/create_payment", &body, configure).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("must be positive"), "{body}");
    }
}

#[actix_web::test]
async fn provider_failures_are_server_errors() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_json("/create_payment_payok", r#"{"chat_id":42,"amount":10.0}"#, configure).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.contains("merchant disabled"), "{body}");
}

fn configure(cfg: &mut ServiceConfig) {
    let mut backend = MockPaymentBackend::new();
    backend.expect_settle_payment().returning(|reference| match reference {
        "order_1_100" => Ok(Settlement::Settled { payment: payment(reference, PaymentStatus::Paid), note: note() }),
        "order_1_200" => Ok(Settlement::AlreadySettled(payment(reference, PaymentStatus::Paid))),
        _ => Err(PaymentError::PaymentNotFound(reference.to_string())),
    });
    backend.expect_update_payment_status().returning(|reference, status| Ok(payment(reference, status)));
    backend.expect_fetch_last_rate().returning(|currency| match currency {
        Currency::Rub => Ok(ExchangeRate::new(Currency::Rub, 90.0)),
        c => Err(ExchangeRateError::RateDoesNotExist(c)),
    });
    backend
        .expect_insert_payment()
        .withf(|p: &NewPayment| p.amount == Money::from(10_000_000))
        .returning(|p| Ok(Payment { url: p.url, ..payment(&p.reference, PaymentStatus::Pending) }));
    backend.expect_set_payment_url().returning(|reference, url| {
        Ok(Payment { url: url.to_string(), ..payment(reference, PaymentStatus::Pending) })
    });
    let payments_api = PaymentFlowApi::new(backend, EventProducers::default());
    let providers = PaymentProviders {
        cryptomus: Arc::new(StaticLinks { kind: PaymentProvider::Cryptomus, online: true }),
        aaio: Arc::new(StaticLinks { kind: PaymentProvider::Aaio, online: true }),
        payok: Arc::new(StaticLinks { kind: PaymentProvider::Payok, online: false }),
    };
    cfg.service(health)
        .service(WebhookRoute::<MockPaymentBackend>::new())
        .service(AaioNotificationRoute::<MockPaymentBackend>::new())
        .service(PayokNotificationRoute::<MockPaymentBackend>::new())
        .service(CreatePaymentRoute::<MockPaymentBackend>::new())
        .service(CreatePaymentAaioRoute::<MockPaymentBackend>::new())
        .service(CreatePaymentPayokRoute::<MockPaymentBackend>::new())
        .app_data(web::Data::new(payments_api))
        .app_data(web::Data::new(providers));
}

fn payment(reference: &str, status: PaymentStatus) -> Payment {
    let created = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    Payment {
        reference: reference.to_string(),
        user_id: 1,
        amount: Money::from(10_000_000),
        url: format!("https://pay.example/{reference}"),
        status,
        provider: PaymentProvider::Cryptomus,
        created_at: created,
        updated_at: created,
    }
}

fn note() -> CreditNote {
    CreditNote { user_id: 1, credited: Money::from(10_000_000), ..CreditNote::default() }
}
