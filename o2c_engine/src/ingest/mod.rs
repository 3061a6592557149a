//! File-based inventory replenishment.
//!
//! Upstream systems drop `product_id,quantity` CSV files into an inbox directory. The ingester
//! scans the inbox on a fixed interval, applies each valid line as an atomic stock increment, and
//! renames the file with a `.processed` suffix once it is done. The rename is the sole idempotency
//! guard: a crash between the last increment and the rename means the file is applied again on
//! restart, the documented at-least-once trade-off.
mod report;
mod watcher;

pub use report::{IngestReport, SkipReason, SkippedLine};
pub use watcher::{CsvRestockIngester, IngestConfig, IngestError};
