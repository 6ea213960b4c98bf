use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EnrollmentGrantedEvent,
    EventHandler,
    EventProducer,
    Handler,
    PaymentFailedEvent,
    TransactionRefundedEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub enrollment_granted_producer: Vec<EventProducer<EnrollmentGrantedEvent>>,
    pub payment_failed_producer: Vec<EventProducer<PaymentFailedEvent>>,
    pub transaction_refunded_producer: Vec<EventProducer<TransactionRefundedEvent>>,
}

pub struct EventHandlers {
    pub on_enrollment_granted: Option<EventHandler<EnrollmentGrantedEvent>>,
    pub on_payment_failed: Option<EventHandler<PaymentFailedEvent>>,
    pub on_transaction_refunded: Option<EventHandler<TransactionRefundedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_enrollment_granted = hooks.on_enrollment_granted.map(|f| EventHandler::new(buffer_size, f));
        let on_payment_failed = hooks.on_payment_failed.map(|f| EventHandler::new(buffer_size, f));
        let on_transaction_refunded = hooks.on_transaction_refunded.map(|f| EventHandler::new(buffer_size, f));
        Self { on_enrollment_granted, on_payment_failed, on_transaction_refunded }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_enrollment_granted {
            result.enrollment_granted_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_payment_failed {
            result.payment_failed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_transaction_refunded {
            result.transaction_refunded_producer.push(handler.subscribe());
        }
        result
    }

    /// Spawns a task per configured handler. Each task ends once all of its producers have been dropped.
    pub fn start_handlers(self) -> Vec<tokio::task::JoinHandle<()>> {
        let mut tasks = Vec::with_capacity(3);
        if let Some(handler) = self.on_enrollment_granted {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.on_payment_failed {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        if let Some(handler) = self.on_transaction_refunded {
            tasks.push(tokio::spawn(handler.start_handler()));
        }
        tasks
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_enrollment_granted: Option<Handler<EnrollmentGrantedEvent>>,
    pub on_payment_failed: Option<Handler<PaymentFailedEvent>>,
    pub on_transaction_refunded: Option<Handler<TransactionRefundedEvent>>,
}

impl EventHooks {
    pub fn on_enrollment_granted<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(EnrollmentGrantedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_enrollment_granted = Some(Arc::new(f));
        self
    }

    pub fn on_payment_failed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentFailedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_failed = Some(Arc::new(f));
        self
    }

    pub fn on_transaction_refunded<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(TransactionRefundedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_transaction_refunded = Some(Arc::new(f));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.on_enrollment_granted.is_none() && self.on_payment_failed.is_none() && self.on_transaction_refunded.is_none()
    }
}
