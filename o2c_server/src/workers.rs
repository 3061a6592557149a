//! Startup and shutdown wiring for the pipeline workers.
//!
//! The fulfillment consumer and the restock file watcher run as independent tasks that share
//! nothing but the database handle. Notifications ride the engine's event hooks, so alert
//! delivery never sits on either worker's critical path.
use log::*;
use o2c_engine::{
    broker::{InMemoryBroker, OrderQueue},
    events::{EventHandlers, EventHooks},
    ingest::CsvRestockIngester,
    notify::{Alert, AlertKind, NotificationDispatcher, WebhookSink},
    FulfillmentConsumer,
    FulfillmentProcessor,
    SqliteDatabase,
};
use tokio::{sync::watch, task::JoinHandle};

use crate::config::ServerConfig;

pub struct PipelineWorkers {
    shutdown_tx: watch::Sender<bool>,
    consumer: JoinHandle<()>,
    ingester: JoinHandle<()>,
}

impl PipelineWorkers {
    /// Starts the event handlers, the fulfillment consumer and the restock file watcher.
    pub async fn start(db: SqliteDatabase, broker: InMemoryBroker, queue: OrderQueue, config: &ServerConfig) -> Self {
        let dispatcher = build_dispatcher(config);
        let pipeline = &config.pipeline;
        let handlers = EventHandlers::new(pipeline.event_buffer_size, notification_hooks(dispatcher));
        let producers = handlers.producers();
        handlers.start_handlers().await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let processor = FulfillmentProcessor::new(db.clone(), pipeline.retry, producers.clone());
        let consumer = FulfillmentConsumer::new(processor, broker, queue, shutdown_rx.clone());
        let consumer = tokio::spawn(consumer.run());
        let ingester = CsvRestockIngester::new(db, pipeline.ingest.clone(), producers);
        let ingester = tokio::spawn(ingester.run(shutdown_rx));
        Self { shutdown_tx, consumer, ingester }
    }

    /// Signals both workers and waits for them to finish their in-flight work (current message,
    /// current file) before returning.
    pub async fn shutdown(self) {
        info!("🛑️ Shutting down pipeline workers");
        if self.shutdown_tx.send(true).is_err() {
            warn!("🛑️ The pipeline workers were already gone");
        }
        if let Err(e) = self.consumer.await {
            warn!("🛑️ The fulfillment consumer did not shut down cleanly: {e}");
        }
        if let Err(e) = self.ingester.await {
            warn!("🛑️ The restock file watcher did not shut down cleanly: {e}");
        }
        info!("🛑️ Pipeline workers stopped");
    }
}

/// Builds the alert dispatcher: webhook channel when one is configured, log sink otherwise.
pub fn build_dispatcher(config: &ServerConfig) -> NotificationDispatcher {
    let webhook = config.webhook_url.clone().and_then(|url| match WebhookSink::new(url) {
        Ok(sink) => Some(sink),
        Err(e) => {
            error!("🪛️ Could not initialise the webhook sink: {e}. Alerts will go to the log instead.");
            None
        },
    });
    NotificationDispatcher::new(webhook)
}

/// Wires the pipeline's events to the notification dispatcher.
pub fn notification_hooks(dispatcher: NotificationDispatcher) -> EventHooks {
    let mut hooks = EventHooks::default();
    let on_failed = dispatcher.clone();
    hooks.on_order_failed(move |event| {
        let dispatcher = on_failed.clone();
        Box::pin(async move {
            let message =
                format!("Order for {} could not be fulfilled: {}", event.order.customer_name, event.reason);
            dispatcher.dispatch(Alert::new(AlertKind::OrderFailed, event.order.id, message)).await;
        })
    });
    let on_low_stock = dispatcher.clone();
    hooks.on_low_stock(move |event| {
        let dispatcher = on_low_stock.clone();
        Box::pin(async move {
            let message = match event.requested {
                Some(requested) => format!(
                    "Product {}: requested {requested}, available {}. Restock needed.",
                    event.product.name, event.product.stock_quantity
                ),
                None => format!(
                    "Product {} dropped below its reorder threshold ({} < {}).",
                    event.product.name, event.product.stock_quantity, event.product.reorder_threshold
                ),
            };
            dispatcher.dispatch(Alert::new(AlertKind::LowStock, event.product.id, message)).await;
        })
    });
    hooks.on_stock_replenished(move |event| {
        let dispatcher = dispatcher.clone();
        Box::pin(async move {
            let message = format!(
                "Product {} is back above its reorder threshold with {}.",
                event.product.name, event.product.stock_quantity
            );
            dispatcher.dispatch(Alert::new(AlertKind::StockReplenished, event.product.id, message)).await;
        })
    });
    hooks
}
