use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use log::*;
use thiserror::Error;
use tokio::sync::watch;

use crate::{
    db_types::ProductId,
    events::{EventProducers, StockReplenishedEvent},
    ingest::{IngestReport, SkipReason},
    traits::{FulfillmentDatabase, StoreError},
};

pub const DEFAULT_INBOX_DIR: &str = "data/inbox";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

//--------------------------------------     IngestConfig    ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// The directory scanned for restock files.
    pub inbox_dir: PathBuf,
    /// How often the inbox is scanned.
    pub poll_interval: Duration,
    /// Files with this extension are pending; anything else is ignored.
    pub pending_extension: String,
    /// Appended to a file name once the file has been fully processed, which excludes it from
    /// every future scan.
    pub processed_suffix: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            inbox_dir: PathBuf::from(DEFAULT_INBOX_DIR),
            poll_interval: DEFAULT_POLL_INTERVAL,
            pending_extension: "csv".to_string(),
            processed_suffix: ".processed".to_string(),
        }
    }
}

//--------------------------------------     IngestError     ---------------------------------------------------------
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error while ingesting: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Store(StoreError),
}

//--------------------------------------  CsvRestockIngester  --------------------------------------------------------
/// Watches the inbox directory and applies restock files to the inventory store.
///
/// Files are processed one at a time, fully, before the next file (or a shutdown) is considered.
/// Invalid lines are skipped and recorded; a store outage aborts the file *without* renaming it,
/// so the next scan picks it up again (lines already applied are then re-applied, the accepted
/// restart-window risk of rename-after-process).
pub struct CsvRestockIngester<B> {
    db: B,
    config: IngestConfig,
    producers: EventProducers,
}

impl<B> CsvRestockIngester<B>
where B: FulfillmentDatabase
{
    pub fn new(db: B, config: IngestConfig, producers: EventProducers) -> Self {
        Self { db, config, producers }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        if let Err(e) = tokio::fs::create_dir_all(&self.config.inbox_dir).await {
            error!("📂️ Could not create the inbox directory {}: {e}", self.config.inbox_dir.display());
            return;
        }
        info!(
            "📂️ Restock file watcher started on {} (every {:?})",
            self.config.inbox_dir.display(),
            self.config.poll_interval
        );
        let mut timer = tokio::time::interval(self.config.poll_interval);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => {
                    info!("📂️ Restock file watcher received the shutdown signal");
                    break;
                },
                _ = timer.tick() => {
                    self.scan_inbox(&shutdown).await;
                },
            }
        }
        info!("📂️ Restock file watcher has shut down");
    }

    /// Scans the inbox once and processes every pending file, oldest name first. Returns the
    /// report for each file that was fully processed and renamed.
    pub async fn scan_inbox(&self, shutdown: &watch::Receiver<bool>) -> Vec<IngestReport> {
        let mut pending = match self.pending_files().await {
            Ok(files) => files,
            Err(e) => {
                error!("📂️ Could not scan {}: {e}", self.config.inbox_dir.display());
                return Vec::new();
            },
        };
        pending.sort();
        let mut reports = Vec::with_capacity(pending.len());
        for path in pending {
            // The file in hand always completes; fresh files can wait for the next scan.
            if *shutdown.borrow() {
                break;
            }
            match self.process_file(&path).await {
                Ok(report) => {
                    info!("📂️ {report}");
                    for skip in &report.skipped {
                        warn!("📂️ Skipped line {} of {} ({}): {}", skip.line, report.file.display(), skip.reason, skip.content);
                    }
                    if let Err(e) = self.mark_processed(&path).await {
                        // Leaving the file as-is means it will be re-applied next scan; better
                        // noisy double-counts than silently lost restocks.
                        error!("📂️ Could not rename {} after processing: {e}", path.display());
                    } else {
                        reports.push(report);
                    }
                },
                Err(e) => {
                    error!("📂️ Error processing {}: {e}. The file stays in the inbox.", path.display());
                },
            }
        }
        reports
    }

    /// Parses one restock file and applies every valid line as an atomic stock increment.
    pub async fn process_file(&self, path: &Path) -> Result<IngestReport, IngestError> {
        debug!("📂️ Processing {}", path.display());
        let bytes = tokio::fs::read(path).await?;
        let mut report = IngestReport::new(path.to_path_buf());
        let mut reader = csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(bytes.as_slice());
        for (idx, record) in reader.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    let line = e.position().map(|p| p.line() as usize).unwrap_or(idx + 1);
                    report.record_skip(line, &e.to_string(), SkipReason::Malformed);
                    continue;
                },
            };
            let line = record.position().map(|p| p.line() as usize).unwrap_or(idx + 1);
            let content = record.iter().collect::<Vec<_>>().join(",");
            if record.len() < 2 {
                report.record_skip(line, &content, SkipReason::Malformed);
                continue;
            }
            let (product_id, qty) = match (record[0].trim().parse::<i64>(), record[1].trim().parse::<i64>()) {
                (Ok(id), Ok(qty)) => (ProductId::from(id), qty),
                _ => {
                    report.record_skip(line, &content, SkipReason::NotNumeric);
                    continue;
                },
            };
            if qty <= 0 {
                report.record_skip(line, &content, SkipReason::NonPositiveQuantity);
                continue;
            }
            match self.db.adjust_stock(product_id, qty.into()).await {
                Ok(adjustment) => {
                    report.applied += 1;
                    debug!(
                        "📂️ Restocked product {product_id} by {qty}: {} -> {}",
                        adjustment.previous,
                        adjustment.new_level()
                    );
                    if adjustment.crossed_above_threshold() {
                        info!(
                            "📂️ Product {product_id} is back above its reorder threshold ({}).",
                            adjustment.new_level()
                        );
                        self.call_stock_replenished_hook(StockReplenishedEvent::new(adjustment.product.clone())).await;
                    }
                },
                Err(StoreError::ProductNotFound(id)) => {
                    report.record_skip(line, &content, SkipReason::UnknownProduct(id));
                },
                // Store trouble aborts the whole file; it will be rescanned once the store is back.
                Err(e) => return Err(IngestError::Store(e)),
            }
        }
        Ok(report)
    }

    async fn pending_files(&self) -> Result<Vec<PathBuf>, std::io::Error> {
        let mut entries = tokio::fs::read_dir(&self.config.inbox_dir).await?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_pending = path
                .extension()
                .map(|ext| ext.to_string_lossy() == self.config.pending_extension.as_str())
                .unwrap_or(false);
            if is_pending && entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                files.push(path);
            }
        }
        Ok(files)
    }

    async fn mark_processed(&self, path: &Path) -> Result<(), std::io::Error> {
        let mut target = path.to_path_buf().into_os_string();
        target.push(&self.config.processed_suffix);
        tokio::fs::rename(path, &target).await
    }

    async fn call_stock_replenished_hook(&self, event: StockReplenishedEvent) {
        for emitter in &self.producers.stock_replenished_producer {
            emitter.publish_event(event.clone()).await;
        }
    }
}
