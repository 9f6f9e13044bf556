//! Engine event hooks for the server process.
//!
//! The hooks write an audit trail of every committed financial side effect to the `smm::audit` log target, so that
//! credits can be traced without querying the database.
use log::*;
use smm_engine::events::{EventHandlers, EventHooks, OrderRefundedEvent, PaymentSettledEvent, PromoRedeemedEvent};

pub const AUDIT_EVENT_BUFFER_SIZE: usize = 25;
const AUDIT_TARGET: &str = "smm::audit";

pub fn create_audit_event_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_payment_settled(|ev| {
        let PaymentSettledEvent { payment, note } = ev;
        Box::pin(async move {
            info!(
                target: AUDIT_TARGET,
                "📬️ Payment {} ({}) settled. Account {} credited {} (bonus {}, referral commission {})",
                payment.reference,
                payment.provider,
                note.user_id,
                note.credited,
                note.bonus,
                note.commission
            );
        })
    });
    hooks.on_order_refunded(|ev| {
        let OrderRefundedEvent { order, amount } = ev;
        Box::pin(async move {
            info!(
                target: AUDIT_TARGET,
                "📬️ Order {} ({}) refunded {amount} to account {}",
                order.order_id,
                order.status,
                order.user_id
            );
        })
    });
    hooks.on_promo_redeemed(|ev| {
        let PromoRedeemedEvent { code, note } = ev;
        Box::pin(async move {
            info!(target: AUDIT_TARGET, "📬️ Promo code {code} credited {} to account {}", note.credited, note.user_id);
        })
    });
    EventHandlers::new(AUDIT_EVENT_BUFFER_SIZE, hooks)
}
