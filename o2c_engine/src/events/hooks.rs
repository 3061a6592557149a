use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{
    EventHandler,
    EventProducer,
    Handler,
    LowStockEvent,
    OrderFailedEvent,
    OrderFulfilledEvent,
    StockReplenishedEvent,
};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_fulfilled_producer: Vec<EventProducer<OrderFulfilledEvent>>,
    pub order_failed_producer: Vec<EventProducer<OrderFailedEvent>>,
    pub low_stock_producer: Vec<EventProducer<LowStockEvent>>,
    pub stock_replenished_producer: Vec<EventProducer<StockReplenishedEvent>>,
}

pub struct EventHandlers {
    pub on_order_fulfilled: Option<EventHandler<OrderFulfilledEvent>>,
    pub on_order_failed: Option<EventHandler<OrderFailedEvent>>,
    pub on_low_stock: Option<EventHandler<LowStockEvent>>,
    pub on_stock_replenished: Option<EventHandler<StockReplenishedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_fulfilled = hooks.on_order_fulfilled.map(|f| EventHandler::new(buffer_size, f));
        let on_order_failed = hooks.on_order_failed.map(|f| EventHandler::new(buffer_size, f));
        let on_low_stock = hooks.on_low_stock.map(|f| EventHandler::new(buffer_size, f));
        let on_stock_replenished = hooks.on_stock_replenished.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_fulfilled, on_order_failed, on_low_stock, on_stock_replenished }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_fulfilled {
            result.order_fulfilled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_failed {
            result.order_failed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_low_stock {
            result.low_stock_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_stock_replenished {
            result.stock_replenished_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_fulfilled {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_order_failed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_low_stock {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_stock_replenished {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_fulfilled: Option<Handler<OrderFulfilledEvent>>,
    pub on_order_failed: Option<Handler<OrderFailedEvent>>,
    pub on_low_stock: Option<Handler<LowStockEvent>>,
    pub on_stock_replenished: Option<Handler<StockReplenishedEvent>>,
}

impl EventHooks {
    pub fn on_order_fulfilled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderFulfilledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_fulfilled = Some(Arc::new(f));
        self
    }

    pub fn on_order_failed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderFailedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_failed = Some(Arc::new(f));
        self
    }

    pub fn on_low_stock<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(LowStockEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_low_stock = Some(Arc::new(f));
        self
    }

    pub fn on_stock_replenished<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(StockReplenishedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_stock_replenished = Some(Arc::new(f));
        self
    }
}
