use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType},
    traits::StoreError,
};

/// Read/write access to order records and their status state machine.
#[allow(async_fn_in_trait)]
pub trait OrderManagement {
    /// Fetches the order with the given id, or `None` if it does not exist.
    async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Returns all orders, oldest first.
    async fn fetch_orders(&self) -> Result<Vec<Order>, StoreError>;

    /// Inserts a new order with `Pending` status and a zero attempt count, returning the stored
    /// record.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;

    /// Transitions the order to `status`, updating `updated_at`.
    ///
    /// The transition must be legal under [`OrderStatusType::can_transition_to`]; an illegal
    /// transition returns `StoreError::InvalidStatusTransition` and changes nothing. Orders are
    /// never deleted, only terminal-stated.
    async fn update_order_status(&self, id: OrderId, status: OrderStatusType) -> Result<Order, StoreError>;

    /// Increments the order's persisted attempt count by one and returns the new count.
    async fn increment_attempts(&self, id: OrderId) -> Result<i64, StoreError>;
}
