//! Retry-bound enforcement, terminal classification and idempotent redelivery.
mod support;

use std::time::Duration;

use o2c_common::StockQty;
use o2c_engine::{
    db_types::{NewOrder, NewProduct, OrderStatusType, ProductId},
    events::EventProducers,
    message::{FailureReason, OrderMessage},
    traits::{InventoryManagement, OrderManagement, StoreError},
    Backoff,
    Disposition,
    FulfillmentProcessor,
    RetryPolicy,
};

fn quick_policy() -> RetryPolicy {
    RetryPolicy { max_attempts: 5, backoff: Backoff::Fixed(Duration::from_millis(1)) }
}

#[tokio::test]
async fn retry_bound_reaches_dead_letter_on_sixth_failure() {
    let db = support::setup_db().await;
    let product = db
        .insert_product(NewProduct::new("Out of stock", 10.0, StockQty::from(0)))
        .await
        .expect("Error inserting product");
    let order = db
        .insert_order(NewOrder::new("Carol", product.id, StockQty::from(1)))
        .await
        .expect("Error inserting order");
    let processor = FulfillmentProcessor::new(db.clone(), quick_policy(), EventProducers::default());

    // Five failures in a row: each one parks the order and schedules a redelivery, and the
    // attempt count strictly increases.
    let mut message = OrderMessage::new(order.id);
    for attempt in 1..=5 {
        message = match processor.process(&message).await {
            Disposition::Retry(envelope) => envelope,
            other => panic!("Attempt {attempt}: expected a retry disposition, got {other:?}"),
        };
        assert_eq!(message.attempt_count, attempt);
        let parked = db.fetch_order(order.id).await.unwrap().unwrap();
        assert_eq!(parked.status, OrderStatusType::AwaitingRestock);
        assert_eq!(parked.attempt_count, attempt);
    }

    // The sixth failure exceeds the bound and is terminal.
    match processor.process(&message).await {
        Disposition::DeadLetter(letter) => {
            assert_eq!(letter.order_id, order.id);
            assert_eq!(letter.attempt_count, 6);
            assert_eq!(letter.reason, FailureReason::InsufficientStock);
        },
        other => panic!("Expected a dead letter, got {other:?}"),
    }
    let failed = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(failed.status, OrderStatusType::Failed);
}

#[tokio::test]
async fn missing_product_is_terminal_on_the_first_attempt() {
    let db = support::setup_db().await;
    let order = db
        .insert_order(NewOrder::new("Dave", ProductId::from(99), StockQty::from(1)))
        .await
        .expect("Error inserting order");
    let processor = FulfillmentProcessor::new(db.clone(), quick_policy(), EventProducers::default());

    // No retries for a product that does not exist: straight to the dead-letter queue.
    match processor.process(&OrderMessage::new(order.id)).await {
        Disposition::DeadLetter(letter) => {
            assert_eq!(letter.order_id, order.id);
            assert_eq!(letter.attempt_count, 1);
            assert_eq!(letter.reason, FailureReason::ProductNotFound);
        },
        other => panic!("Expected a dead letter, got {other:?}"),
    }
    let failed = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(failed.status, OrderStatusType::Failed);
}

#[tokio::test]
async fn redelivery_for_a_terminal_order_is_discarded() {
    let db = support::setup_db().await;
    let product = db
        .insert_product(NewProduct::new("Widget", 5.0, StockQty::from(10)))
        .await
        .expect("Error inserting product");
    let order = db
        .insert_order(NewOrder::new("Erin", product.id, StockQty::from(4)))
        .await
        .expect("Error inserting order");
    let processor = FulfillmentProcessor::new(db.clone(), quick_policy(), EventProducers::default());

    let message = OrderMessage::new(order.id);
    assert!(matches!(processor.process(&message).await, Disposition::Ack));
    let stock = db.fetch_product(product.id).await.unwrap().unwrap().stock_quantity;
    assert_eq!(stock, StockQty::from(6));

    // The broker redelivers the same message twice more; both are discarded without touching
    // stock or status.
    for _ in 0..2 {
        assert!(matches!(processor.process(&message).await, Disposition::Discard));
    }
    let order = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Fulfilled);
    let stock = db.fetch_product(product.id).await.unwrap().unwrap().stock_quantity;
    assert_eq!(stock, StockQty::from(6));
}

#[tokio::test]
async fn store_rejects_illegal_status_transitions() {
    let db = support::setup_db().await;
    let product = db
        .insert_product(NewProduct::new("Widget", 5.0, StockQty::from(10)))
        .await
        .expect("Error inserting product");
    let order = db
        .insert_order(NewOrder::new("Frank", product.id, StockQty::from(1)))
        .await
        .expect("Error inserting order");

    // Pending cannot jump straight to Fulfilled.
    let err = db.update_order_status(order.id, OrderStatusType::Fulfilled).await.expect_err("Expected rejection");
    assert!(matches!(err, StoreError::InvalidStatusTransition { .. }));

    // Walk the legal path, then confirm a terminal order cannot be reopened.
    db.update_order_status(order.id, OrderStatusType::Processing).await.expect("Pending -> Processing");
    db.update_order_status(order.id, OrderStatusType::Fulfilled).await.expect("Processing -> Fulfilled");
    let err = db.update_order_status(order.id, OrderStatusType::Processing).await.expect_err("Expected rejection");
    assert!(matches!(err, StoreError::InvalidStatusTransition { .. }));
}

#[tokio::test]
async fn message_for_an_unknown_order_is_discarded() {
    let db = support::setup_db().await;
    let processor = FulfillmentProcessor::new(db.clone(), quick_policy(), EventProducers::default());
    let message = OrderMessage::new(o2c_engine::db_types::OrderId::from(424242));
    assert!(matches!(processor.process(&message).await, Disposition::Discard));
}
