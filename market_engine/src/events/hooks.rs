use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, MessageSentEvent, OrderPlacedEvent, ReviewSubmittedEvent};

type BoxedHook<E> = dyn (Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync;

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_placed_producer: Vec<EventProducer<OrderPlacedEvent>>,
    pub review_submitted_producer: Vec<EventProducer<ReviewSubmittedEvent>>,
    pub message_sent_producer: Vec<EventProducer<MessageSentEvent>>,
}

pub struct EventHandlers {
    pub on_order_placed: Option<EventHandler<OrderPlacedEvent>>,
    pub on_review_submitted: Option<EventHandler<ReviewSubmittedEvent>>,
    pub on_message_sent: Option<EventHandler<MessageSentEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_placed = hooks.on_order_placed.map(|f| EventHandler::new(buffer_size, f));
        let on_review_submitted = hooks.on_review_submitted.map(|f| EventHandler::new(buffer_size, f));
        let on_message_sent = hooks.on_message_sent.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_placed, on_review_submitted, on_message_sent }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_placed {
            result.order_placed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_review_submitted {
            result.review_submitted_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_message_sent {
            result.message_sent_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_placed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_review_submitted {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_message_sent {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_placed: Option<Handler<OrderPlacedEvent>>,
    pub on_review_submitted: Option<Handler<ReviewSubmittedEvent>>,
    pub on_message_sent: Option<Handler<MessageSentEvent>>,
}

impl EventHooks {
    pub fn on_order_placed<F>(&mut self, f: F) -> &mut Self
    where F: Fn(OrderPlacedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
        self.on_order_placed = Some(Arc::new(f) as Arc<BoxedHook<OrderPlacedEvent>>);
        self
    }

    pub fn on_review_submitted<F>(&mut self, f: F) -> &mut Self
    where F: Fn(ReviewSubmittedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
        self.on_review_submitted = Some(Arc::new(f) as Arc<BoxedHook<ReviewSubmittedEvent>>);
        self
    }

    pub fn on_message_sent<F>(&mut self, f: F) -> &mut Self
    where F: Fn(MessageSentEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync + 'static {
        self.on_message_sent = Some(Arc::new(f) as Arc<BoxedHook<MessageSentEvent>>);
        self
    }
}
