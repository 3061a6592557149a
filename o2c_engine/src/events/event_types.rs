use o2c_common::StockQty;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, Product},
    message::FailureReason,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFulfilledEvent {
    pub order: Order,
}

impl OrderFulfilledEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderFailedEvent {
    pub order: Order,
    pub reason: FailureReason,
}

impl OrderFailedEvent {
    pub fn new(order: Order, reason: FailureReason) -> Self {
        Self { order, reason }
    }
}

/// Raised when a fulfillment drags a product's stock below its reorder threshold, or when an
/// order could not be covered at all (in which case `requested` carries the unmet quantity).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LowStockEvent {
    pub product: Product,
    pub requested: Option<StockQty>,
}

impl LowStockEvent {
    pub fn threshold_crossed(product: Product) -> Self {
        Self { product, requested: None }
    }

    pub fn order_unmet(product: Product, requested: StockQty) -> Self {
        Self { product, requested: Some(requested) }
    }
}

/// Raised when a restock lifts a product's stock from below its reorder threshold back to
/// at-or-above it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockReplenishedEvent {
    pub product: Product,
}

impl StockReplenishedEvent {
    pub fn new(product: Product) -> Self {
        Self { product }
    }
}
