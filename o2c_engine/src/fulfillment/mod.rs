//! The asynchronous order-fulfillment pipeline.
//!
//! [`FulfillmentProcessor`] implements the per-message decision procedure (validate, decrement,
//! transition, classify failures); [`FulfillmentConsumer`] is the worker loop that feeds it from
//! the order queue and carries out its decisions against the broker and retry scheduler.
mod consumer;
mod processor;

pub use consumer::FulfillmentConsumer;
pub use processor::{Disposition, FulfillmentProcessor};
