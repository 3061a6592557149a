//! Order-to-Cash integration engine
//!
//! This library contains the core logic for the order-to-cash hub: the asynchronous fulfillment
//! pipeline that reconciles queued orders against inventory, the retry scheduler that redelivers
//! recoverable failures, the CSV restock ingester that replenishes the same inventory from files,
//! and the notification dispatcher that raises low-stock and failure alerts. It is
//! provider-agnostic.
//!
//! The library is divided into a few main sections:
//! 1. Database management and control ([`mod@sqlite`], [`mod@traits`]). SQLite is the supported
//!    backend. You should never need to access the database directly; the pipeline talks to the
//!    traits in [`mod@traits`], and any backend implementing them can stand in.
//! 2. The pipeline itself ([`mod@fulfillment`], [`mod@retry`], [`mod@ingest`]). The fulfillment
//!    consumer and the file ingester run as independent tasks and share nothing but the store;
//!    every stock mutation is a single atomic conditional operation against that store.
//! 3. The messaging seams ([`mod@broker`], [`mod@message`]). The broker is an external
//!    collaborator behind a trait; an in-process implementation with the same at-least-once,
//!    manual-ack contract is provided for the server and the tests.
//!
//! The engine also provides a set of events that can be subscribed to ([`mod@events`]). These are
//! emitted when orders are fulfilled or failed and when stock crosses its reorder threshold, and
//! they carry the alerting path ([`mod@notify`]) off the pipeline's critical path.
pub mod broker;
pub mod db_types;
pub mod events;
pub mod fulfillment;
pub mod ingest;
pub mod message;
pub mod notify;
pub mod retry;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use fulfillment::{Disposition, FulfillmentConsumer, FulfillmentProcessor};
pub use retry::{Backoff, RetryPolicy, RetryScheduler};
