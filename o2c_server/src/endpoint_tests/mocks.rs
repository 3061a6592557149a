use mockall::mock;
use o2c_common::StockQty;
use o2c_engine::{
    broker::{BrokerError, DeliveryTag, MessageBroker},
    db_types::{NewOrder, NewProduct, Order, OrderId, OrderStatusType, Product, ProductId},
    message::{DeadLetter, OrderMessage},
    traits::{FulfillmentDatabase, InventoryManagement, OrderManagement, StockAdjustment, StoreError},
};

mock! {
    pub FulfillmentDb {}
    impl Clone for FulfillmentDb {
        fn clone(&self) -> Self;
    }
    impl OrderManagement for FulfillmentDb {
        async fn fetch_order(&self, id: OrderId) -> Result<Option<Order>, StoreError>;
        async fn fetch_orders(&self) -> Result<Vec<Order>, StoreError>;
        async fn insert_order(&self, order: NewOrder) -> Result<Order, StoreError>;
        async fn update_order_status(&self, id: OrderId, status: OrderStatusType) -> Result<Order, StoreError>;
        async fn increment_attempts(&self, id: OrderId) -> Result<i64, StoreError>;
    }
    impl InventoryManagement for FulfillmentDb {
        async fn fetch_product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
        async fn fetch_products(&self) -> Result<Vec<Product>, StoreError>;
        async fn insert_product(&self, product: NewProduct) -> Result<Product, StoreError>;
        async fn adjust_stock(&self, id: ProductId, delta: StockQty) -> Result<StockAdjustment, StoreError>;
    }
    impl FulfillmentDatabase for FulfillmentDb {
        fn url(&self) -> &str;
    }
}

mock! {
    pub Broker {}
    impl Clone for Broker {
        fn clone(&self) -> Self;
    }
    impl MessageBroker for Broker {
        async fn publish(&self, message: OrderMessage) -> Result<(), BrokerError>;
        async fn publish_dead_letter(&self, letter: DeadLetter) -> Result<(), BrokerError>;
        async fn ack(&self, tag: DeliveryTag) -> Result<(), BrokerError>;
    }
}
