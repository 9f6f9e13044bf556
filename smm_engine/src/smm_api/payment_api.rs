use std::fmt::Debug;

use chrono::Utc;
use log::*;
use serde::Deserialize;

use crate::{
    db_types::{CreditNote, Currency, Money, NewPayment, Payment, PaymentNotification, PaymentStatus},
    events::{EventProducers, PaymentSettledEvent},
    helpers::reference_nonce,
    traits::{
        ExchangeRateError,
        ExchangeRates,
        PaymentError,
        PaymentLinkProvider,
        PaymentLinkRequest,
        PaymentManagement,
        Settlement,
    },
};

/// A request to top up an account, as sent by the bot front end.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PaymentRequest {
    pub chat_id: i64,
    pub amount: f64,
    #[serde(default)]
    pub currency: Currency,
}

/// `PaymentFlowApi` creates payment intents and applies the notifications that payment providers send back.
pub struct PaymentFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for PaymentFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentFlowApi")
    }
}

impl<B> PaymentFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> PaymentFlowApi<B>
where B: PaymentManagement + ExchangeRates
{
    /// Stores a `pending` payment and then asks `provider` for its checkout link.
    ///
    /// The payment is on record before the provider knows about it, so a notification can never arrive for a reference
    /// we have not stored. If the provider fails, the payment is marked `fail`.
    ///
    /// The stored amount is always in base currency. Amounts in the secondary currency are converted at the latest
    /// stored rate; the link itself is created in the currency the customer asked for.
    pub async fn create_payment(
        &self,
        provider: &dyn PaymentLinkProvider,
        request: PaymentRequest,
    ) -> Result<Payment, PaymentError> {
        if !request.amount.is_finite() || request.amount <= 0.0 {
            return Err(PaymentError::InvalidAmount);
        }
        let amount = Money::try_from(request.amount).map_err(|_| PaymentError::InvalidAmount)?;
        let amount = match request.currency {
            Currency::Usd => amount,
            currency => {
                let rate = self.db.fetch_last_rate(currency).await.map_err(|e| match e {
                    ExchangeRateError::RateDoesNotExist(c) => PaymentError::ExchangeRateUnavailable(c),
                    e => PaymentError::DatabaseError(e.to_string()),
                })?;
                amount.convert_from(rate.rate)
            },
        };
        if !amount.is_positive() {
            return Err(PaymentError::InvalidAmount);
        }
        let kind = provider.provider();
        let reference = kind.new_reference(request.chat_id, Utc::now().timestamp_millis(), &reference_nonce());
        let payment =
            NewPayment { reference, user_id: request.chat_id, amount, url: String::default(), provider: kind };
        let payment = self.db.insert_payment(payment).await?;
        let reference = payment.reference;
        let link_request = PaymentLinkRequest {
            reference: reference.clone(),
            amount: request.amount,
            currency: request.currency,
            description: format!("Balance top-up for {}", request.chat_id),
        };
        let url = match provider.create_payment_link(&link_request).await {
            Ok(url) => url,
            Err(e) => {
                warn!("💳️ {kind} could not create a payment link for {reference}. {e}");
                if let Err(e) = self.db.update_payment_status(&reference, PaymentStatus::Fail).await {
                    error!("💳️ Payment {reference} could not be marked as failed. {e}");
                }
                return Err(PaymentError::ProviderError(e.to_string()));
            },
        };
        let payment = self.db.set_payment_url(&reference, &url).await?;
        info!("💳️ Payment {} for {} created with {kind}", payment.reference, payment.amount);
        Ok(payment)
    }

    /// Applies a verified provider notification.
    ///
    /// A `paid` notification settles the payment exactly once; replays return [`Settlement::AlreadySettled`].
    /// Any other status is recorded, unless the payment is already paid.
    pub async fn process_notification(&self, notification: PaymentNotification) -> Result<NotificationOutcome, PaymentError> {
        let reference = notification.reference.as_str();
        if !notification.status.is_paid() {
            let payment = self.db.update_payment_status(reference, notification.status).await?;
            debug!("💳️ Payment {reference} notification: {}. Stored status is {}", notification.status, payment.status);
            return Ok(NotificationOutcome::StatusRecorded(payment));
        }
        if let Some(amount) = notification.amount {
            trace!("💳️ Provider reports {amount} for payment {reference}");
        }
        match self.db.settle_payment(reference).await? {
            Settlement::Settled { payment, note } => {
                info!("💳️ Payment {reference} settled. {} credited to account {}", note.credited, payment.user_id);
                self.call_payment_settled_hook(&payment, &note).await;
                Ok(NotificationOutcome::Settled(Settlement::Settled { payment, note }))
            },
            Settlement::AlreadySettled(payment) => {
                info!("💳️ Payment {reference} was already settled. Ignoring the repeat notification");
                Ok(NotificationOutcome::Settled(Settlement::AlreadySettled(payment)))
            },
        }
    }

    async fn call_payment_settled_hook(&self, payment: &Payment, note: &CreditNote) {
        for emitter in &self.producers.payment_settled_producer {
            debug!("💳️ Notifying payment settled hook subscribers");
            emitter.publish_event(PaymentSettledEvent { payment: payment.clone(), note: note.clone() }).await;
        }
    }

    pub async fn fetch_payment(&self, reference: &str) -> Result<Option<Payment>, PaymentError> {
        self.db.fetch_payment(reference).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
    Settled(Settlement),
    StatusRecorded(Payment),
}

impl NotificationOutcome {
    pub fn status(&self) -> PaymentStatus {
        match self {
            NotificationOutcome::Settled(_) => PaymentStatus::Paid,
            NotificationOutcome::StatusRecorded(p) => p.status,
        }
    }
}
