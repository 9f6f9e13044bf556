use serde::Serialize;

use crate::db_types::{CreditNote, Money, Order, Payment, TenantId};

/// A payment was settled and its amount credited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSettledEvent {
    pub payment: Payment,
    pub note: CreditNote,
}

/// The reconciler refunded an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderRefundedEvent {
    pub order: Order,
    pub amount: Money,
}

/// A fixed promo code or special link credited an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromoRedeemedEvent {
    pub code: String,
    pub note: CreditNote,
}

/// A new tenant was registered and should be started without waiting for the next supervisor scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantRegisteredEvent {
    pub tenant: TenantId,
}
