//! Concurrent fulfillment attempts against one product must never drive stock below zero.
mod support;

use futures_util::future::join_all;
use o2c_common::StockQty;
use o2c_engine::{
    db_types::NewProduct,
    traits::{InventoryManagement, StoreError},
};

const WORKERS: usize = 16;
const STOCK: i64 = 5;

#[tokio::test]
async fn concurrent_decrements_never_go_negative() {
    let db = support::setup_db().await;
    let product = db
        .insert_product(NewProduct::new("Contended", 1.0, StockQty::from(STOCK)))
        .await
        .expect("Error inserting product");

    // Sixteen tasks race to take one unit each from a stock of five. The conditional adjust in
    // the store is the only thing standing between them and a negative stock level.
    let tasks = (0..WORKERS)
        .map(|_| {
            let db = db.clone();
            let id = product.id;
            tokio::spawn(async move { db.adjust_stock(id, StockQty::from(-1)).await })
        })
        .collect::<Vec<_>>();
    let results = join_all(tasks).await;

    let mut successes = 0;
    let mut shortages = 0;
    for result in results {
        match result.expect("Worker task panicked") {
            Ok(adjustment) => {
                assert!(!adjustment.new_level().is_negative());
                successes += 1;
            },
            Err(StoreError::InsufficientStock { available, .. }) => {
                assert!(!available.is_negative());
                shortages += 1;
            },
            Err(e) => panic!("Unexpected store error: {e}"),
        }
    }
    assert_eq!(successes, STOCK as usize);
    assert_eq!(shortages, WORKERS - STOCK as usize);

    let stock = db.fetch_product(product.id).await.unwrap().unwrap().stock_quantity;
    assert_eq!(stock, StockQty::from(0));
}
