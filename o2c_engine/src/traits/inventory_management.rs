use o2c_common::StockQty;

use crate::{
    db_types::{NewProduct, Product, ProductId},
    traits::{StockAdjustment, StoreError},
};

/// Read/write access to the product catalogue and stock levels.
#[allow(async_fn_in_trait)]
pub trait InventoryManagement {
    /// Fetches the product with the given id, or `None` if it does not exist.
    async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Returns all products, ordered by id.
    async fn fetch_products(&self) -> Result<Vec<Product>, StoreError>;

    /// Inserts a new product and returns the stored record.
    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError>;

    /// Applies `delta` to the product's stock level as a single atomic conditional operation.
    ///
    /// The adjustment succeeds only if the resulting level is non-negative; otherwise nothing is
    /// changed and `StoreError::InsufficientStock` is returned. This is the one and only way the
    /// pipeline mutates stock: the condition lives in the store, not in application code, so two
    /// concurrent adjustments can never interleave into a negative or double-counted level.
    async fn adjust_stock(&self, id: ProductId, delta: StockQty) -> Result<StockAdjustment, StoreError>;
}
