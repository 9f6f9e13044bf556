//! Request handler definitions
//!
//! Define each route and its handler here. Handlers that are more than a few lines go into a helper function at the
//! bottom of this module, or into the engine. Keep this module neat and tidy 🙏
//!
//! Every handler is async. Database and provider calls are awaited, so a slow provider never blocks the worker thread
//! that is serving other requests.
use std::sync::Arc;

use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use smm_engine::{
    db_types::PaymentNotification,
    traits::{ExchangeRates, PaymentLinkProvider, PaymentManagement},
    PaymentFlowApi,
    PaymentRequest,
};

use crate::{
    data_objects::{CryptomusNotification, NotificationResponse, PaymentLinkResponse, ProviderNotificationForm},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<A>(core::marker::PhantomData<fn() -> A>);}
        paste::paste! { impl<A> [<$name:camel Route>]<A> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> A>)
            }
        }}
        paste::paste! { impl<A> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<A>
        where
            A: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<A>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

/// The checkout providers, one per payment-link route.
#[derive(Clone)]
pub struct PaymentProviders {
    pub cryptomus: Arc<dyn PaymentLinkProvider>,
    pub aaio: Arc<dyn PaymentLinkProvider>,
    pub payok: Arc<dyn PaymentLinkProvider>,
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Notifications  ---------------------------------------------------
route!(webhook => Post "/webhook" impl PaymentManagement, ExchangeRates);
/// Cryptomus payment notifications.
///
/// `paid` settles the payment exactly once. `check`, `cancel` and `fail` are recorded unless the payment has already
/// been paid. Replays of a `paid` notification return 200 without crediting anything.
pub async fn webhook<B>(
    body: web::Json<CryptomusNotification>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentManagement + ExchangeRates,
{
    trace!("💻️ Received Cryptomus notification: {body:?}");
    let notification = PaymentNotification::try_from(body.into_inner())?;
    apply_notification(&api, notification).await
}

route!(aaio_notification => Post "/aaio_notification" impl PaymentManagement, ExchangeRates);
pub async fn aaio_notification<B>(
    form: web::Form<ProviderNotificationForm>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentManagement + ExchangeRates,
{
    trace!("💻️ Received AAIO notification: {form:?}");
    provider_form_notification(&api, &form).await
}

route!(payok_notification => Post "/payok_notification" impl PaymentManagement, ExchangeRates);
pub async fn payok_notification<B>(
    form: web::Form<ProviderNotificationForm>,
    api: web::Data<PaymentFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentManagement + ExchangeRates,
{
    trace!("💻️ Received PayOK notification: {form:?}");
    provider_form_notification(&api, &form).await
}

//----------------------------------------------   Payment links  ---------------------------------------------------
route!(create_payment => Post "/create_payment" impl PaymentManagement, ExchangeRates);
pub async fn create_payment<B>(
    body: web::Json<PaymentRequest>,
    api: web::Data<PaymentFlowApi<B>>,
    providers: web::Data<PaymentProviders>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentManagement + ExchangeRates,
{
    create_payment_link(&api, providers.cryptomus.as_ref(), body.into_inner()).await
}

route!(create_payment_aaio => Post "/create_payment_aaio" impl PaymentManagement, ExchangeRates);
pub async fn create_payment_aaio<B>(
    body: web::Json<PaymentRequest>,
    api: web::Data<PaymentFlowApi<B>>,
    providers: web::Data<PaymentProviders>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentManagement + ExchangeRates,
{
    create_payment_link(&api, providers.aaio.as_ref(), body.into_inner()).await
}

route!(create_payment_payok => Post "/create_payment_payok" impl PaymentManagement, ExchangeRates);
pub async fn create_payment_payok<B>(
    body: web::Json<PaymentRequest>,
    api: web::Data<PaymentFlowApi<B>>,
    providers: web::Data<PaymentProviders>,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentManagement + ExchangeRates,
{
    create_payment_link(&api, providers.payok.as_ref(), body.into_inner()).await
}

//----------------------------------------------   Helpers  ---------------------------------------------------------
async fn provider_form_notification<B>(
    api: &PaymentFlowApi<B>,
    form: &ProviderNotificationForm,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentManagement + ExchangeRates,
{
    let reference = form
        .reference()
        .ok_or_else(|| ServerError::InvalidRequestBody("Neither order_id nor payment_id was provided".into()))?;
    apply_notification(api, PaymentNotification::paid(reference)).await
}

async fn apply_notification<B>(
    api: &PaymentFlowApi<B>,
    notification: PaymentNotification,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentManagement + ExchangeRates,
{
    let reference = notification.reference.clone();
    let outcome = api.process_notification(notification).await.map_err(|e| {
        warn!("💻️ Could not apply the notification for payment {reference}. {e}");
        ServerError::from(e)
    })?;
    Ok(HttpResponse::Ok().json(NotificationResponse { reference, status: outcome.status() }))
}

async fn create_payment_link<B>(
    api: &PaymentFlowApi<B>,
    provider: &dyn PaymentLinkProvider,
    request: PaymentRequest,
) -> Result<HttpResponse, ServerError>
where
    B: PaymentManagement + ExchangeRates,
{
    debug!("💻️ Payment link requested from {} for chat {}", provider.provider(), request.chat_id);
    let payment = api.create_payment(provider, request).await?;
    Ok(HttpResponse::Ok().json(PaymentLinkResponse::success(payment.url)))
}
