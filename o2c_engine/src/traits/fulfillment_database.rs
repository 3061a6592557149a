use o2c_common::StockQty;
use thiserror::Error;

use crate::{
    db_types::{OrderId, OrderStatusType, ProductId},
    traits::{InventoryManagement, OrderManagement},
};

/// The full backend contract for the order-to-cash pipeline.
///
/// A backend stores orders and products, exposes the atomic conditional stock operation, and is
/// cheap to clone (a pool handle). The fulfillment consumer and the file ingester share one
/// backend instance; it is the only mutable state they have in common.
#[allow(async_fn_in_trait)]
pub trait FulfillmentDatabase: Clone + InventoryManagement + OrderManagement {
    /// The URL of the backing store.
    fn url(&self) -> &str;

    /// Closes the store connection.
    async fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Internal store engine error: {0}")]
    DatabaseError(String),
    #[error("The requested product {0} does not exist")]
    ProductNotFound(ProductId),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock { product_id: ProductId, requested: StockQty, available: StockQty },
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidStatusTransition { order_id: OrderId, from: OrderStatusType, to: OrderStatusType },
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}
