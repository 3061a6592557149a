//! Wire types for the order queues.
//!
//! The envelope's `attempt_count` is authoritative for retry-bound enforcement. It is carried
//! forward on every republish, and reconciled against (never assumed equal to) the count persisted
//! on the order record, so that a lagging store cannot stretch the retry budget.
use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::OrderId;

//--------------------------------------    OrderMessage     ---------------------------------------------------------
/// The message published on order creation and on every scheduled redelivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderMessage {
    pub order_id: OrderId,
    pub attempt_count: i64,
    pub enqueued_at: DateTime<Utc>,
}

impl OrderMessage {
    pub fn new(order_id: OrderId) -> Self {
        Self { order_id, attempt_count: 0, enqueued_at: Utc::now() }
    }

    /// The envelope for the next redelivery of this order.
    pub fn redelivery(&self, attempt_count: i64) -> Self {
        Self { order_id: self.order_id, attempt_count, enqueued_at: Utc::now() }
    }
}

impl Display for OrderMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order {} (attempt {})", self.order_id, self.attempt_count)
    }
}

//--------------------------------------    FailureReason    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The product exists, but does not have enough stock to cover the order. Recoverable.
    InsufficientStock,
    /// The order references a product that does not exist. Not recoverable.
    ProductNotFound,
    /// The backing store could not be reached or errored mid-mutation. Recoverable.
    StoreUnavailable,
}

impl FailureReason {
    pub fn is_transient(&self) -> bool {
        matches!(self, FailureReason::InsufficientStock | FailureReason::StoreUnavailable)
    }
}

impl Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::InsufficientStock => write!(f, "insufficient stock"),
            FailureReason::ProductNotFound => write!(f, "product not found"),
            FailureReason::StoreUnavailable => write!(f, "store unavailable"),
        }
    }
}

//--------------------------------------      DeadLetter     ---------------------------------------------------------
/// The terminal record published for an order that exhausted its retries (or failed a
/// non-recoverable check). Consumed by operators, not by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub order_id: OrderId,
    pub attempt_count: i64,
    pub reason: FailureReason,
}

impl DeadLetter {
    pub fn new(order_id: OrderId, attempt_count: i64, reason: FailureReason) -> Self {
        Self { order_id, attempt_count, reason }
    }
}

impl Display for DeadLetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order {} dead-lettered after {} attempts: {}", self.order_id, self.attempt_count, self.reason)
    }
}
