//! An in-process broker with at-least-once semantics.
//!
//! This is the broker the server runs with and the tests exercise. It keeps the same contract a
//! networked broker would: tagged deliveries, manual acks, an in-flight table, and an inspectable
//! dead-letter queue. [`InMemoryBroker::redeliver_unacked`] re-queues everything that was
//! delivered but never acked, which is how tests simulate broker-level redelivery after a
//! consumer crash.
use std::{collections::HashMap, sync::Arc};

use log::{debug, warn};
use tokio::sync::{mpsc, Mutex};

use super::{BrokerError, Delivery, DeliveryTag, MessageBroker, OrderQueue};
use crate::message::{DeadLetter, OrderMessage};

#[derive(Default)]
struct BrokerState {
    next_tag: u64,
    in_flight: HashMap<DeliveryTag, OrderMessage>,
    dead_letters: Vec<DeadLetter>,
}

#[derive(Clone)]
pub struct InMemoryBroker {
    sender: mpsc::Sender<Delivery>,
    state: Arc<Mutex<BrokerState>>,
}

impl InMemoryBroker {
    /// Creates the broker and its single consuming handle.
    pub fn channel(buffer_size: usize) -> (Self, OrderQueue) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let broker = Self { sender, state: Arc::new(Mutex::new(BrokerState::default())) };
        (broker, OrderQueue::new(receiver))
    }

    /// A snapshot of the dead-letter queue, for operator inspection and tests.
    pub async fn dead_letters(&self) -> Vec<DeadLetter> {
        self.state.lock().await.dead_letters.clone()
    }

    /// How many deliveries have been handed to the consumer but not yet acked.
    pub async fn in_flight_count(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }

    /// Pushes every unacked delivery back onto the primary queue with a fresh tag.
    ///
    /// Returns the number of messages redelivered.
    pub async fn redeliver_unacked(&self) -> Result<usize, BrokerError> {
        let unacked = {
            let mut state = self.state.lock().await;
            state.in_flight.drain().map(|(_, m)| m).collect::<Vec<_>>()
        };
        let count = unacked.len();
        if count > 0 {
            warn!("📮️ Redelivering {count} unacked messages");
        }
        for message in unacked {
            self.publish(message).await?;
        }
        Ok(count)
    }
}

impl MessageBroker for InMemoryBroker {
    async fn publish(&self, message: OrderMessage) -> Result<(), BrokerError> {
        let tag = {
            let mut state = self.state.lock().await;
            state.next_tag += 1;
            let tag = DeliveryTag(state.next_tag);
            state.in_flight.insert(tag, message.clone());
            tag
        };
        debug!("📮️ Publishing {message} as {tag}");
        if self.sender.send(Delivery { tag, message }).await.is_err() {
            // Nobody is consuming any more; forget the in-flight entry we just made.
            self.state.lock().await.in_flight.remove(&tag);
            return Err(BrokerError::QueueClosed);
        }
        Ok(())
    }

    async fn publish_dead_letter(&self, letter: DeadLetter) -> Result<(), BrokerError> {
        warn!("📮️ {letter}");
        self.state.lock().await.dead_letters.push(letter);
        Ok(())
    }

    async fn ack(&self, tag: DeliveryTag) -> Result<(), BrokerError> {
        let mut state = self.state.lock().await;
        match state.in_flight.remove(&tag) {
            Some(_) => Ok(()),
            None => Err(BrokerError::UnknownDeliveryTag(tag)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db_types::OrderId;

    #[tokio::test]
    async fn publish_deliver_ack() {
        let (broker, mut queue) = InMemoryBroker::channel(8);
        broker.publish(OrderMessage::new(OrderId(1))).await.unwrap();
        let delivery = queue.recv().await.unwrap();
        assert_eq!(delivery.message.order_id, OrderId(1));
        assert_eq!(broker.in_flight_count().await, 1);
        broker.ack(delivery.tag).await.unwrap();
        assert_eq!(broker.in_flight_count().await, 0);
    }

    #[tokio::test]
    async fn double_ack_is_an_error() {
        let (broker, mut queue) = InMemoryBroker::channel(8);
        broker.publish(OrderMessage::new(OrderId(7))).await.unwrap();
        let delivery = queue.recv().await.unwrap();
        broker.ack(delivery.tag).await.unwrap();
        assert!(matches!(broker.ack(delivery.tag).await, Err(BrokerError::UnknownDeliveryTag(_))));
    }

    #[tokio::test]
    async fn unacked_messages_can_be_redelivered() {
        let (broker, mut queue) = InMemoryBroker::channel(8);
        broker.publish(OrderMessage::new(OrderId(3))).await.unwrap();
        let first = queue.recv().await.unwrap();
        // Simulate a consumer crash: the delivery is never acked.
        drop(first);
        let redelivered = broker.redeliver_unacked().await.unwrap();
        assert_eq!(redelivered, 1);
        let second = queue.recv().await.unwrap();
        assert_eq!(second.message.order_id, OrderId(3));
    }

    #[tokio::test]
    async fn dead_letters_are_inspectable() {
        use crate::message::FailureReason;
        let (broker, _queue) = InMemoryBroker::channel(8);
        broker.publish_dead_letter(DeadLetter::new(OrderId(9), 6, FailureReason::InsufficientStock)).await.unwrap();
        let letters = broker.dead_letters().await;
        assert_eq!(letters.len(), 1);
        assert_eq!(letters[0].order_id, OrderId(9));
        assert_eq!(letters[0].reason, FailureReason::InsufficientStock);
    }
}
