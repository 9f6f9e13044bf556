use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, OrderRefundedEvent, PaymentSettledEvent, PromoRedeemedEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub payment_settled_producer: Vec<EventProducer<PaymentSettledEvent>>,
    pub order_refunded_producer: Vec<EventProducer<OrderRefundedEvent>>,
    pub promo_redeemed_producer: Vec<EventProducer<PromoRedeemedEvent>>,
}

pub struct EventHandlers {
    pub on_payment_settled: Option<EventHandler<PaymentSettledEvent>>,
    pub on_order_refunded: Option<EventHandler<OrderRefundedEvent>>,
    pub on_promo_redeemed: Option<EventHandler<PromoRedeemedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_payment_settled = hooks.on_payment_settled.map(|f| EventHandler::new(buffer_size, f));
        let on_order_refunded = hooks.on_order_refunded.map(|f| EventHandler::new(buffer_size, f));
        let on_promo_redeemed = hooks.on_promo_redeemed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_payment_settled, on_order_refunded, on_promo_redeemed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_payment_settled {
            result.payment_settled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_refunded {
            result.order_refunded_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_promo_redeemed {
            result.promo_redeemed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_payment_settled {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_refunded {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_promo_redeemed {
            tokio::spawn(handler.start_handler());
        }
    }
}

type BoxedHook<E> = dyn (Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync;

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_payment_settled: Option<Handler<PaymentSettledEvent>>,
    pub on_order_refunded: Option<Handler<OrderRefundedEvent>>,
    pub on_promo_redeemed: Option<Handler<PromoRedeemedEvent>>,
}

impl EventHooks {
    pub fn on_payment_settled<F>(&mut self, f: F) -> &mut Self
    where F: Fn(PaymentSettledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
        let f: Arc<BoxedHook<PaymentSettledEvent>> = Arc::new(f);
        self.on_payment_settled = Some(f);
        self
    }

    pub fn on_order_refunded<F>(&mut self, f: F) -> &mut Self
    where F: Fn(OrderRefundedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
        let f: Arc<BoxedHook<OrderRefundedEvent>> = Arc::new(f);
        self.on_order_refunded = Some(f);
        self
    }

    pub fn on_promo_redeemed<F>(&mut self, f: F) -> &mut Self
    where F: Fn(PromoRedeemedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
        let f: Arc<BoxedHook<PromoRedeemedEvent>> = Arc::new(f);
        self.on_promo_redeemed = Some(f);
        self
    }
}
