use log::*;
use tokio::sync::watch;

use crate::{
    broker::{Delivery, DeliveryTag, MessageBroker, OrderQueue},
    fulfillment::{Disposition, FulfillmentProcessor},
    retry::RetryScheduler,
    traits::FulfillmentDatabase,
};

/// The single logical consumer of the order queue.
///
/// Messages are handled one at a time, which makes per-order mutual exclusion trivial; the safety
/// of concurrent stock mutation against the file ingester comes from the store's atomic
/// conditional adjust, not from this loop.
///
/// The loop exits when the shutdown watch flips (or its sender is dropped), or when the queue
/// closes, always after finishing the delivery it is working on. Keep the shutdown sender alive
/// for as long as the consumer should run.
pub struct FulfillmentConsumer<B, M>
where
    B: FulfillmentDatabase,
    M: MessageBroker + 'static,
{
    processor: FulfillmentProcessor<B>,
    broker: M,
    scheduler: RetryScheduler<M>,
    queue: OrderQueue,
    shutdown: watch::Receiver<bool>,
}

impl<B, M> FulfillmentConsumer<B, M>
where
    B: FulfillmentDatabase,
    M: MessageBroker + 'static,
{
    pub fn new(
        processor: FulfillmentProcessor<B>,
        broker: M,
        queue: OrderQueue,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let scheduler = RetryScheduler::new(broker.clone(), processor.policy().backoff);
        Self { processor, broker, scheduler, queue, shutdown }
    }

    pub async fn run(mut self) {
        info!("📦️ Fulfillment consumer started");
        loop {
            let delivery = tokio::select! {
                biased;
                _ = self.shutdown.changed() => {
                    info!("📦️ Fulfillment consumer received the shutdown signal");
                    break;
                },
                maybe = self.queue.recv() => match maybe {
                    Some(delivery) => delivery,
                    None => {
                        info!("📦️ Order queue closed");
                        break;
                    },
                },
            };
            // In-flight work completes before the next shutdown check.
            self.handle(delivery).await;
        }
        info!("📦️ Fulfillment consumer has shut down");
    }

    async fn handle(&self, delivery: Delivery) {
        let Delivery { tag, message } = delivery;
        trace!("📦️ Handling delivery {tag} for {message}");
        match self.processor.process(&message).await {
            Disposition::Discard | Disposition::Ack => self.ack(tag).await,
            Disposition::Retry(next) => {
                // The scheduler owns the redelivery from here on, so the working message can be
                // acked without waiting out the backoff.
                self.scheduler.schedule(next);
                self.ack(tag).await;
            },
            Disposition::DeadLetter(letter) => match self.broker.publish_dead_letter(letter).await {
                Ok(()) => self.ack(tag).await,
                Err(e) => {
                    // Not acking keeps the message recoverable; losing a terminal failure
                    // silently is the one thing this loop must never do.
                    error!("📦️ Could not publish the dead letter for {message}: {e}. Leaving {tag} unacked.");
                },
            },
        }
    }

    async fn ack(&self, tag: DeliveryTag) {
        if let Err(e) = self.broker.ack(tag).await {
            warn!("📦️ Could not ack delivery {tag}: {e}");
        }
    }
}
