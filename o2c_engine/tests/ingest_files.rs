//! Restock-file ingestion: valid lines apply, invalid lines are recorded, files never reprocess.
mod support;

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use o2c_common::StockQty;
use o2c_engine::{
    db_types::NewProduct,
    events::{EventHandlers, EventHooks, EventProducers},
    ingest::{CsvRestockIngester, IngestConfig, SkipReason},
    traits::InventoryManagement,
};

fn inbox_config(dir: &std::path::Path) -> IngestConfig {
    IngestConfig { inbox_dir: dir.to_path_buf(), ..Default::default() }
}

#[tokio::test]
async fn mixed_file_applies_valid_lines_and_records_the_rest() {
    let db = support::setup_db().await;
    let product = db
        .insert_product(NewProduct::new("Gadget", 12.5, StockQty::from(10)))
        .await
        .expect("Error inserting product");
    let pid = product.id.value();

    let inbox = tempfile::tempdir().expect("Error creating temp inbox");
    let lines = format!("{pid},5\nnot,a,number\n{pid}\n{pid},-3\n9999,4\n{pid},0\n{pid},2\n");
    std::fs::write(inbox.path().join("restock.csv"), lines).expect("Error writing restock file");
    // A file without the pending extension must be left alone.
    std::fs::write(inbox.path().join("notes.txt"), "9999,100\n").expect("Error writing decoy file");

    let ingester = CsvRestockIngester::new(db.clone(), inbox_config(inbox.path()), EventProducers::default());
    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let reports = ingester.scan_inbox(&shutdown_rx).await;

    assert_eq!(reports.len(), 1);
    let report = &reports[0];
    assert_eq!(report.applied, 2);
    let reasons = report.skipped.iter().map(|s| s.reason.clone()).collect::<Vec<_>>();
    assert_eq!(reasons.len(), 4);
    assert!(reasons.contains(&SkipReason::NotNumeric));
    assert!(reasons.contains(&SkipReason::Malformed));
    assert!(reasons.iter().filter(|r| **r == SkipReason::NonPositiveQuantity).count() == 2);
    assert!(reasons.iter().any(|r| matches!(r, SkipReason::UnknownProduct(id) if id.value() == 9999)));

    // Only the two valid lines were applied: 10 + 5 + 2.
    let stock = db.fetch_product(product.id).await.unwrap().unwrap().stock_quantity;
    assert_eq!(stock, StockQty::from(17));

    // The file was renamed out of the pending set; the decoy was not touched.
    assert!(!inbox.path().join("restock.csv").exists());
    assert!(inbox.path().join("restock.csv.processed").exists());
    assert!(inbox.path().join("notes.txt").exists());

    // A rescan finds nothing to do and does not reapply the deltas.
    let reports = ingester.scan_inbox(&shutdown_rx).await;
    assert!(reports.is_empty());
    let stock = db.fetch_product(product.id).await.unwrap().unwrap().stock_quantity;
    assert_eq!(stock, StockQty::from(17));
}

#[tokio::test]
async fn replenishment_above_threshold_raises_an_event() {
    let db = support::setup_db().await;
    let product = db
        .insert_product(
            NewProduct::new("Scarce", 99.0, StockQty::from(1)).with_reorder_threshold(StockQty::from(5)),
        )
        .await
        .expect("Error inserting product");

    let fired = Arc::new(AtomicUsize::new(0));
    let counter = fired.clone();
    let mut hooks = EventHooks::default();
    hooks.on_stock_replenished(move |event| {
        let counter = counter.clone();
        Box::pin(async move {
            assert!(event.product.stock_quantity >= event.product.reorder_threshold);
            counter.fetch_add(1, Ordering::SeqCst);
        })
    });
    let handlers = EventHandlers::new(8, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let inbox = tempfile::tempdir().expect("Error creating temp inbox");
    std::fs::write(inbox.path().join("restock.csv"), format!("{},10\n", product.id.value()))
        .expect("Error writing restock file");
    let ingester = CsvRestockIngester::new(db.clone(), inbox_config(inbox.path()), producers);
    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let reports = ingester.scan_inbox(&shutdown_rx).await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].applied, 1);

    // The hook runs off the ingest path; give it a moment.
    let mut waited = Duration::ZERO;
    while fired.load(Ordering::SeqCst) == 0 && waited < Duration::from_secs(2) {
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += Duration::from_millis(20);
    }
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // A second restock does not cross the threshold again, so no second event.
    std::fs::write(inbox.path().join("more.csv"), format!("{},10\n", product.id.value()))
        .expect("Error writing restock file");
    let reports = ingester.scan_inbox(&shutdown_rx).await;
    assert_eq!(reports.len(), 1);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}
