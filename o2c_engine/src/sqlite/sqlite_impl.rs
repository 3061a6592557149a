//! `SqliteDatabase` is a concrete implementation of an order-to-cash pipeline backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the
//! [`crate::traits`] module.
use std::fmt::Debug;

use o2c_common::StockQty;
use sqlx::SqlitePool;

use super::db::{new_pool, orders, products};
use crate::{
    db_types::{NewOrder, NewProduct, Order, OrderId, OrderStatusType, Product, ProductId},
    traits::{FulfillmentDatabase, InventoryManagement, OrderManagement, StockAdjustment, StoreError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Creates a new database pool with `max_connections` connections to the given URL.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any outstanding schema migrations.
    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./src/sqlite/migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::DatabaseError(e.to_string()))
    }
}

impl InventoryManagement for SqliteDatabase {
    async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product_by_id(id, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_products(&self) -> Result<Vec<Product>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = products::fetch_products(&mut conn).await?;
        Ok(result)
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError> {
        let mut conn = self.pool.acquire().await?;
        products::insert_product(product, &mut conn).await
    }

    async fn adjust_stock(&self, id: ProductId, delta: StockQty) -> Result<StockAdjustment, StoreError> {
        let mut conn = self.pool.acquire().await?;
        products::conditional_adjust_stock(id, delta, &mut conn).await
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_id(id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_orders(&self) -> Result<Vec<Order>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::fetch_orders(&mut conn).await?;
        Ok(result)
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::insert_order(order, &mut conn).await
    }

    async fn update_order_status(&self, id: OrderId, status: OrderStatusType) -> Result<Order, StoreError> {
        // The transition guard reads before it writes; a transaction keeps the pair race-free.
        let mut tx = self.pool.begin().await?;
        let order = orders::update_order_status(id, status, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn increment_attempts(&self, id: OrderId) -> Result<i64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        orders::increment_attempts(id, &mut conn).await
    }
}

impl FulfillmentDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }
}
