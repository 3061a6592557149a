use log::trace;
use o2c_common::StockQty;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewProduct, Product, ProductId},
    traits::{StockAdjustment, StoreError},
};

pub async fn insert_product(product: NewProduct, conn: &mut SqliteConnection) -> Result<Product, StoreError> {
    let product = sqlx::query_as(
        r#"
            INSERT INTO products (name, unit_price, stock_quantity, reorder_threshold)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(product.name)
    .bind(product.unit_price)
    .bind(product.stock_quantity)
    .bind(product.reorder_threshold)
    .fetch_one(conn)
    .await?;
    Ok(product)
}

pub async fn fetch_product_by_id(id: ProductId, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    let product = sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(product)
}

pub async fn fetch_products(conn: &mut SqliteConnection) -> Result<Vec<Product>, sqlx::Error> {
    let products = sqlx::query_as("SELECT * FROM products ORDER BY id ASC").fetch_all(conn).await?;
    Ok(products)
}

/// Applies `delta` to the product's stock level, succeeding only if the result is non-negative.
///
/// The condition is part of the UPDATE statement itself, so the check and the write are a single
/// atomic operation as far as every other connection is concerned. There is deliberately no
/// read-modify-write variant of this function.
pub async fn conditional_adjust_stock(
    id: ProductId,
    delta: StockQty,
    conn: &mut SqliteConnection,
) -> Result<StockAdjustment, StoreError> {
    let updated: Option<Product> = sqlx::query_as(
        r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $1, updated_at = CURRENT_TIMESTAMP
            WHERE id = $2 AND stock_quantity + $1 >= 0
            RETURNING *;
        "#,
    )
    .bind(delta)
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;
    match updated {
        Some(product) => {
            let previous = product.stock_quantity - delta;
            trace!("🗃️ Stock for product {id} adjusted by {delta}: {previous} -> {}", product.stock_quantity);
            Ok(StockAdjustment { product, previous })
        },
        // The update matched nothing: either the product is missing, or the condition failed.
        None => match fetch_product_by_id(id, conn).await? {
            Some(product) => Err(StoreError::InsufficientStock {
                product_id: id,
                requested: -delta,
                available: product.stock_quantity,
            }),
            None => Err(StoreError::ProductNotFound(id)),
        },
    }
}
