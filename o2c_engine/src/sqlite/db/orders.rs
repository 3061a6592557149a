use log::debug;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType},
    traits::StoreError,
};

/// Inserts a new order into the database using the given connection. This is not atomic. You can
/// embed this call inside a transaction if you need to ensure atomicity, and pass `&mut *tx` as
/// the connection argument.
///
/// New orders always start out `Pending` with a zero attempt count; the caller does not get a say.
pub async fn insert_order(order: NewOrder, conn: &mut SqliteConnection) -> Result<Order, StoreError> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (customer_name, product_id, quantity, total_amount)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(order.customer_name)
    .bind(order.product_id)
    .bind(order.quantity)
    .bind(order.total_amount)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order_by_id(id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

/// Returns all orders, oldest first.
pub async fn fetch_orders(conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as("SELECT * FROM orders ORDER BY created_at ASC, id ASC").fetch_all(conn).await?;
    Ok(orders)
}

/// Transitions the order to `status`, enforcing the monotonic status state machine.
///
/// The read and the write happen on the same connection; run this inside a transaction when the
/// guard must be race-free against other writers.
pub async fn update_order_status(
    id: OrderId,
    status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Order, StoreError> {
    let current = fetch_order_by_id(id, conn).await?.ok_or(StoreError::OrderNotFound(id))?;
    if current.status != status && !current.status.can_transition_to(status) {
        return Err(StoreError::InvalidStatusTransition { order_id: id, from: current.status, to: status });
    }
    let order: Order =
        sqlx::query_as("UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2 RETURNING *")
            .bind(status.to_string())
            .bind(id)
            .fetch_one(conn)
            .await?;
    debug!("🗃️ Order {} moved from {} to {status}", id, current.status);
    Ok(order)
}

/// Bumps the persisted attempt counter and returns the new count.
pub async fn increment_attempts(id: OrderId, conn: &mut SqliteConnection) -> Result<i64, StoreError> {
    let count: Option<(i64,)> = sqlx::query_as(
        "UPDATE orders SET attempt_count = attempt_count + 1, updated_at = CURRENT_TIMESTAMP WHERE id = $1 RETURNING \
         attempt_count",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    count.map(|(c,)| c).ok_or(StoreError::OrderNotFound(id))
}
