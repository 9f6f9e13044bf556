use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use smm_engine::db_types::{Money, PaymentNotification, PaymentStatus};

use crate::errors::ServerError;

/// The Cryptomus callback body. Cryptomus sends amounts as strings, but some test tools send numbers.
#[derive(Debug, Clone, Deserialize)]
pub struct CryptomusNotification {
    pub order_id: String,
    pub status: String,
    #[serde(default)]
    pub amount: Option<NotificationAmount>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NotificationAmount {
    Number(f64),
    Text(String),
}

impl Display for NotificationAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationAmount::Number(v) => write!(f, "{v}"),
            NotificationAmount::Text(s) => write!(f, "'{s}'"),
        }
    }
}

impl NotificationAmount {
    pub fn to_money(&self) -> Option<Money> {
        let value = match self {
            NotificationAmount::Number(v) => *v,
            NotificationAmount::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        Money::try_from(value).ok()
    }
}

impl TryFrom<CryptomusNotification> for PaymentNotification {
    type Error = ServerError;

    fn try_from(value: CryptomusNotification) -> Result<Self, Self::Error> {
        if value.order_id.trim().is_empty() {
            return Err(ServerError::InvalidRequestBody("order_id is empty".into()));
        }
        let status = PaymentStatus::from_str(&value.status).map_err(|e| ServerError::InvalidRequestBody(e.to_string()))?;
        let amount = match &value.amount {
            None => None,
            Some(a) => {
                Some(a.to_money().ok_or_else(|| ServerError::InvalidRequestBody(format!("{a} is not a valid amount")))?)
            },
        };
        Ok(PaymentNotification { reference: value.order_id.trim().to_string(), status, amount })
    }
}

/// The AAIO and PayOK callback forms. AAIO echoes our reference as `order_id`, PayOK as `payment_id`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderNotificationForm {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub payment_id: Option<String>,
}

impl ProviderNotificationForm {
    pub fn reference(&self) -> Option<&str> {
        self.order_id.as_deref().or(self.payment_id.as_deref()).map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLinkResponse {
    pub url: String,
    pub status: String,
}

impl PaymentLinkResponse {
    pub fn success(url: String) -> Self {
        Self { url, status: "success".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub reference: String,
    pub status: PaymentStatus,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cryptomus_amounts() {
        let n: CryptomusNotification =
            serde_json::from_str(r#"{"order_id":"order_1_2","status":"paid","amount":"12.50"}"#).unwrap();
        let n = PaymentNotification::try_from(n).unwrap();
        assert_eq!(n.status, PaymentStatus::Paid);
        assert_eq!(n.amount, Some(Money::from(12_500_000)));

        let n: CryptomusNotification = serde_json::from_str(r#"{"order_id":"order_1_2","status":"check"}"#).unwrap();
        let n = PaymentNotification::try_from(n).unwrap();
        assert_eq!(n.status, PaymentStatus::Check);
        assert_eq!(n.amount, None);
    }

    #[test]
    fn unknown_status_is_rejected() {
        let n: CryptomusNotification =
            serde_json::from_str(r#"{"order_id":"order_1_2","status":"refunded"}"#).unwrap();
        assert!(matches!(PaymentNotification::try_from(n), Err(ServerError::InvalidRequestBody(_))));
    }

    #[test]
    fn unreadable_amounts_are_rejected() {
        for amount in ["\"ten\"", "\"\"", "\"1e999\""] {
            let json = format!(r#"{{"order_id":"order_1_2","status":"paid","amount":{amount}}}"#);
            let n: CryptomusNotification = serde_json::from_str(&json).unwrap();
            match PaymentNotification::try_from(n) {
                Err(ServerError::InvalidRequestBody(msg)) => assert!(msg.contains("is not a valid amount"), "{msg}"),
                other => panic!("Expected a validation error for {amount}, got {other:?}"),
            }
        }
    }

    #[test]
    fn form_reference() {
        let aaio = ProviderNotificationForm { order_id: Some("payment_1_2".into()), payment_id: None };
        assert_eq!(aaio.reference(), Some("payment_1_2"));
        let payok = ProviderNotificationForm { order_id: None, payment_id: Some(" payment_3_4 ".into()) };
        assert_eq!(payok.reference(), Some("payment_3_4"));
        assert_eq!(ProviderNotificationForm::default().reference(), None);
    }
}
