//! The message broker seam.
//!
//! The broker is an external collaborator: the pipeline only ever sees this trait plus a consuming
//! handle. Delivery is at-least-once with manual acknowledgement: a message stays "in flight"
//! from delivery until the consumer acks it, and an unacked message may be delivered again. The
//! pipeline's idempotency guards (terminal-state check, rename-after-process) are what make the
//! duplicates harmless, not anything the broker promises.
mod memory;

use std::fmt::Display;

use thiserror::Error;
use tokio::sync::mpsc;

pub use memory::InMemoryBroker;

use crate::message::{DeadLetter, OrderMessage};

//--------------------------------------    MessageBroker    ---------------------------------------------------------
#[allow(async_fn_in_trait)]
pub trait MessageBroker: Clone + Send + Sync {
    /// Publishes an order message onto the primary queue.
    fn publish(
        &self,
        message: OrderMessage,
    ) -> impl std::future::Future<Output = Result<(), BrokerError>> + Send;

    /// Publishes a terminally-failed order onto the dead-letter queue. Dead letters must be
    /// durable before this returns; the consumer only acks the working message afterwards.
    async fn publish_dead_letter(&self, letter: DeadLetter) -> Result<(), BrokerError>;

    /// Acknowledges the delivery with the given tag, removing it from the in-flight set.
    async fn ack(&self, tag: DeliveryTag) -> Result<(), BrokerError>;
}

//--------------------------------------     DeliveryTag     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeliveryTag(pub u64);

impl Display for DeliveryTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dtag-{}", self.0)
    }
}

//--------------------------------------      Delivery       ---------------------------------------------------------
/// One delivery of an [`OrderMessage`], tagged for manual acknowledgement.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub tag: DeliveryTag,
    pub message: OrderMessage,
}

//--------------------------------------      OrderQueue     ---------------------------------------------------------
/// The consuming side of the primary queue. There is exactly one logical consumer.
pub struct OrderQueue {
    receiver: mpsc::Receiver<Delivery>,
}

impl OrderQueue {
    pub(crate) fn new(receiver: mpsc::Receiver<Delivery>) -> Self {
        Self { receiver }
    }

    /// Waits for the next delivery. Returns `None` once every producer has been dropped and the
    /// queue has drained, which is the consumer's signal to shut down.
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.receiver.recv().await
    }
}

//--------------------------------------     BrokerError     ---------------------------------------------------------
#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    #[error("The queue is closed; the message could not be published")]
    QueueClosed,
    #[error("No in-flight delivery with tag {0}")]
    UnknownDeliveryTag(DeliveryTag),
}
