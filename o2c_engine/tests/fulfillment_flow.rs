//! The end-to-end reconciliation scenario: fulfillment, shortage, restock, redelivery.
mod support;

use o2c_common::StockQty;
use o2c_engine::{
    db_types::{NewOrder, NewProduct, OrderStatusType},
    events::EventProducers,
    ingest::{CsvRestockIngester, IngestConfig},
    message::OrderMessage,
    traits::{InventoryManagement, OrderManagement},
    Disposition,
    FulfillmentProcessor,
    RetryPolicy,
};

#[tokio::test]
async fn fulfillment_and_restock_scenario() {
    let db = support::setup_db().await;
    let product = db
        .insert_product(NewProduct::new("Widget", 25.0, StockQty::from(5)))
        .await
        .expect("Error inserting product");
    let processor = FulfillmentProcessor::new(db.clone(), RetryPolicy::default(), EventProducers::default());

    // Order A requests 3 of the 5 available units.
    let order_a = db
        .insert_order(NewOrder::new("Alice", product.id, StockQty::from(3)).with_total_amount(75.0))
        .await
        .expect("Error inserting order A");
    assert_eq!(order_a.status, OrderStatusType::Pending);
    assert_eq!(order_a.attempt_count, 0);
    let message_a = OrderMessage::new(order_a.id);
    assert!(matches!(processor.process(&message_a).await, Disposition::Ack));
    let order_a = db.fetch_order(order_a.id).await.unwrap().unwrap();
    assert_eq!(order_a.status, OrderStatusType::Fulfilled);
    let stock = db.fetch_product(product.id).await.unwrap().unwrap().stock_quantity;
    assert_eq!(stock, StockQty::from(2));

    // Order B requests 3, but only 2 are left: it parks in AwaitingRestock with one attempt spent.
    let order_b = db
        .insert_order(NewOrder::new("Bob", product.id, StockQty::from(3)).with_total_amount(75.0))
        .await
        .expect("Error inserting order B");
    let redelivery = match processor.process(&OrderMessage::new(order_b.id)).await {
        Disposition::Retry(envelope) => envelope,
        other => panic!("Expected a retry disposition, got {other:?}"),
    };
    assert_eq!(redelivery.attempt_count, 1);
    let parked = db.fetch_order(order_b.id).await.unwrap().unwrap();
    assert_eq!(parked.status, OrderStatusType::AwaitingRestock);
    assert_eq!(parked.attempt_count, 1);
    // The failed reservation must not have touched the stock.
    let stock = db.fetch_product(product.id).await.unwrap().unwrap().stock_quantity;
    assert_eq!(stock, StockQty::from(2));

    // A restock file for 10 units lands in the inbox.
    let inbox = tempfile::tempdir().expect("Error creating temp inbox");
    std::fs::write(inbox.path().join("restock.csv"), format!("{},10\n", product.id.value()))
        .expect("Error writing restock file");
    let config = IngestConfig { inbox_dir: inbox.path().to_path_buf(), ..Default::default() };
    let ingester = CsvRestockIngester::new(db.clone(), config, EventProducers::default());
    let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let reports = ingester.scan_inbox(&shutdown_rx).await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].applied, 1);
    assert!(reports[0].skipped.is_empty());
    let stock = db.fetch_product(product.id).await.unwrap().unwrap().stock_quantity;
    assert_eq!(stock, StockQty::from(12));

    // The scheduled redelivery of order B now succeeds.
    assert!(matches!(processor.process(&redelivery).await, Disposition::Ack));
    let order_b = db.fetch_order(order_b.id).await.unwrap().unwrap();
    assert_eq!(order_b.status, OrderStatusType::Fulfilled);
    let stock = db.fetch_product(product.id).await.unwrap().unwrap().stock_quantity;
    assert_eq!(stock, StockQty::from(9));

    // Fulfillment happens exactly once: replaying order A's message is a no-op.
    assert!(matches!(processor.process(&message_a).await, Disposition::Discard));
    let stock = db.fetch_product(product.id).await.unwrap().unwrap().stock_quantity;
    assert_eq!(stock, StockQty::from(9));
}
