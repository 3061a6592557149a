//! The consumer loop against the in-memory broker: fulfillment, scheduled retries, dead letters
//! and graceful shutdown.
mod support;

use std::time::Duration;

use o2c_common::StockQty;
use o2c_engine::{
    broker::{InMemoryBroker, MessageBroker},
    db_types::{NewOrder, NewProduct, OrderId, OrderStatusType},
    events::EventProducers,
    message::{FailureReason, OrderMessage},
    traits::{FulfillmentDatabase, InventoryManagement, OrderManagement},
    Backoff,
    FulfillmentConsumer,
    FulfillmentProcessor,
    RetryPolicy,
};
use tokio::sync::watch;

async fn wait_for_status<B: FulfillmentDatabase>(db: &B, id: OrderId, status: OrderStatusType) {
    for _ in 0..200 {
        let order = db.fetch_order(id).await.expect("Error fetching order").expect("Order disappeared");
        if order.status == status {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("Order {id} never reached {status}");
}

#[tokio::test]
async fn consumer_loop_fulfills_retries_and_dead_letters() {
    let db = support::setup_db().await;
    let (broker, queue) = InMemoryBroker::channel(32);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let policy = RetryPolicy { max_attempts: 2, backoff: Backoff::Fixed(Duration::from_millis(10)) };
    let processor = FulfillmentProcessor::new(db.clone(), policy, EventProducers::default());
    let consumer = FulfillmentConsumer::new(processor, broker.clone(), queue, shutdown_rx);
    let worker = tokio::spawn(consumer.run());

    let product = db
        .insert_product(NewProduct::new("Widget", 25.0, StockQty::from(5)))
        .await
        .expect("Error inserting product");

    // A coverable order flows straight through to Fulfilled.
    let order_a = db
        .insert_order(NewOrder::new("Alice", product.id, StockQty::from(3)))
        .await
        .expect("Error inserting order");
    broker.publish(OrderMessage::new(order_a.id)).await.expect("Error publishing");
    wait_for_status(&db, order_a.id, OrderStatusType::Fulfilled).await;
    let stock = db.fetch_product(product.id).await.unwrap().unwrap().stock_quantity;
    assert_eq!(stock, StockQty::from(2));

    // An order that can never be covered burns its two retries and lands in the dead-letter
    // queue with three attempts on the envelope.
    let order_b = db
        .insert_order(NewOrder::new("Bob", product.id, StockQty::from(100)))
        .await
        .expect("Error inserting order");
    broker.publish(OrderMessage::new(order_b.id)).await.expect("Error publishing");
    wait_for_status(&db, order_b.id, OrderStatusType::Failed).await;
    let mut letters = broker.dead_letters().await;
    for _ in 0..100 {
        if !letters.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        letters = broker.dead_letters().await;
    }
    assert_eq!(letters.len(), 1);
    assert_eq!(letters[0].order_id, order_b.id);
    assert_eq!(letters[0].attempt_count, 3);
    assert_eq!(letters[0].reason, FailureReason::InsufficientStock);

    // Every delivery was acked once its terminal action completed.
    for _ in 0..100 {
        if broker.in_flight_count().await == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(broker.in_flight_count().await, 0);

    // The loop drains and exits on the shutdown signal.
    shutdown_tx.send(true).expect("Error sending shutdown");
    tokio::time::timeout(Duration::from_secs(5), worker).await.expect("Consumer did not shut down").unwrap();
}
