//! The full worker stack against a real store: queue consumption, file ingestion and shutdown.
use std::time::Duration;

use o2c_common::StockQty;
use o2c_engine::{
    broker::{InMemoryBroker, MessageBroker},
    db_types::{NewOrder, NewProduct, OrderStatusType},
    message::OrderMessage,
    retry::{Backoff, RetryPolicy},
    test_utils::prepare_env::prepare_test_env,
    traits::{InventoryManagement, OrderManagement},
    SqliteDatabase,
};
use o2c_server::{config::ServerConfig, workers::PipelineWorkers};

#[tokio::test]
async fn workers_fulfil_orders_and_ingest_restocks() {
    let scratch = tempfile::tempdir().expect("Error creating scratch dir");
    let url = format!("sqlite://{}/store.db", scratch.path().display());
    prepare_test_env(&url).await;
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");

    let inbox = tempfile::tempdir().expect("Error creating inbox dir");
    let mut config = ServerConfig::default();
    // The backoff must outlast the inbox poll interval, or the retry budget burns before the
    // restock file is picked up.
    config.pipeline.retry = RetryPolicy { max_attempts: 5, backoff: Backoff::Fixed(Duration::from_millis(200)) };
    config.pipeline.ingest.inbox_dir = inbox.path().to_path_buf();
    config.pipeline.ingest.poll_interval = Duration::from_millis(50);

    let (broker, queue) = InMemoryBroker::channel(16);
    let workers = PipelineWorkers::start(db.clone(), broker.clone(), queue, &config).await;

    // An order that exceeds current stock parks, and a restock file dropped into the inbox
    // unblocks its scheduled retry.
    let product = db
        .insert_product(NewProduct::new("Widget", 25.0, StockQty::from(2)))
        .await
        .expect("Error inserting product");
    let order = db
        .insert_order(NewOrder::new("Alice", product.id, StockQty::from(5)))
        .await
        .expect("Error inserting order");
    broker.publish(OrderMessage::new(order.id)).await.expect("Error publishing");

    let mut parked = false;
    for _ in 0..100 {
        let current = db.fetch_order(order.id).await.unwrap().unwrap();
        if current.status == OrderStatusType::AwaitingRestock {
            parked = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(parked, "Order never parked in AwaitingRestock");

    std::fs::write(inbox.path().join("restock.csv"), format!("{},10\n", product.id.value()))
        .expect("Error writing restock file");

    let mut fulfilled = false;
    for _ in 0..200 {
        let current = db.fetch_order(order.id).await.unwrap().unwrap();
        if current.status == OrderStatusType::Fulfilled {
            fulfilled = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(fulfilled, "Order was never fulfilled after the restock");
    let stock = db.fetch_product(product.id).await.unwrap().unwrap().stock_quantity;
    assert_eq!(stock, StockQty::from(7));
    assert!(inbox.path().join("restock.csv.processed").exists());

    // Both loops drain and stop on request.
    tokio::time::timeout(Duration::from_secs(5), workers.shutdown()).await.expect("Workers did not shut down");
}
