//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests:
//! ```nocompile
//!     fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker thread to
//! hang!
//!     }
//! ```
//! For this reason, any long, non-cpu-bound operation (e.g. I/O, database operations, etc.) should be expressed as
//! futures or asynchronous functions. Async handlers get executed concurrently by worker threads and thus don't block
//! execution:
//!
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         tokio::time::sleep(Duration::from_secs(5)).await; // <-- Ok. Worker thread will handle other requests here
//!     }
//! ```
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use o2c_common::StockQty;
use o2c_engine::{
    broker::MessageBroker,
    db_types::{NewOrder, NewProduct, OrderId, ProductId},
    message::OrderMessage,
    traits::{FulfillmentDatabase, InventoryManagement, OrderManagement},
};

use crate::{
    data_objects::{JsonResponse, OrderParams, ProductParams},
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  -----------------------------------------------------
route!(submit_order => Post "/orders" impl FulfillmentDatabase, MessageBroker);
/// Route handler for order submission.
///
/// The order is validated against the product catalogue, stored with `Pending` status, and an
/// order-created message is published for the fulfillment pipeline. If the publish fails the
/// order stays `Pending` in the store and can be requeued via the republish endpoint, so nothing
/// is lost; the client receives a 503 in that case.
pub async fn submit_order<B, M>(
    body: web::Json<OrderParams>,
    db: web::Data<B>,
    broker: web::Data<M>,
) -> Result<HttpResponse, ServerError>
where
    B: FulfillmentDatabase,
    M: MessageBroker + 'static,
{
    let params = body.into_inner();
    debug!("💻️ POST /orders for customer {}", params.customer_name);
    if params.quantity <= 0 {
        return Err(ServerError::InvalidRequestBody("quantity must be positive".to_string()));
    }
    let product_id = ProductId::from(params.product_id);
    let product = db
        .fetch_product(product_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Product {product_id} does not exist")))?;
    let total_amount = product.unit_price * params.quantity as f64;
    let order = db
        .insert_order(
            NewOrder::new(params.customer_name, product_id, StockQty::from(params.quantity))
                .with_total_amount(total_amount),
        )
        .await?;
    info!("💻️ Order {} accepted: {} of {} for {}", order.id, order.quantity, product.name, order.customer_name);
    if let Err(e) = broker.publish(OrderMessage::new(order.id)).await {
        error!("💻️ Order {} was stored but could not be queued: {e}", order.id);
        return Err(e.into());
    }
    Ok(HttpResponse::Created().json(order))
}

route!(orders => Get "/orders" impl OrderManagement);
pub async fn orders<B: OrderManagement>(db: web::Data<B>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET /orders");
    let orders = db.fetch_orders().await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(order_by_id => Get "/orders/{id}" impl OrderManagement);
pub async fn order_by_id<B: OrderManagement>(
    path: web::Path<i64>,
    db: web::Data<B>,
) -> Result<HttpResponse, ServerError> {
    let id = OrderId::from(path.into_inner());
    debug!("💻️ GET /orders/{id}");
    let order =
        db.fetch_order(id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {id} does not exist")))?;
    Ok(HttpResponse::Ok().json(order))
}

route!(republish_order => Post "/orders/{id}/republish" impl OrderManagement, MessageBroker);
/// Route handler for manually requeueing an order.
///
/// Useful when an order is parked in `AwaitingRestock` and an operator knows stock has arrived, or
/// when a queue hiccup left a `Pending` order unpublished. Terminal orders are refused; the
/// attempt count already spent is carried onto the new envelope so a requeue never stretches the
/// retry budget.
pub async fn republish_order<B, M>(
    path: web::Path<i64>,
    db: web::Data<B>,
    broker: web::Data<M>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement,
    M: MessageBroker + 'static,
{
    let id = OrderId::from(path.into_inner());
    debug!("💻️ POST /orders/{id}/republish");
    let order =
        db.fetch_order(id).await?.ok_or_else(|| ServerError::NoRecordFound(format!("Order {id} does not exist")))?;
    if order.status.is_terminal() {
        return Ok(HttpResponse::Conflict()
            .json(JsonResponse::failure(format!("Order {id} is already {} and cannot be requeued", order.status))));
    }
    let message = OrderMessage::new(id).redelivery(order.attempt_count);
    broker.publish(message).await?;
    info!("💻️ Order {id} requeued for fulfillment");
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Order {id} requeued"))))
}

//----------------------------------------------  Products  ----------------------------------------------------
route!(new_product => Post "/products" impl InventoryManagement);
pub async fn new_product<B: InventoryManagement>(
    body: web::Json<ProductParams>,
    db: web::Data<B>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    debug!("💻️ POST /products ({})", params.name);
    if params.name.trim().is_empty() {
        return Err(ServerError::InvalidRequestBody("name must not be empty".to_string()));
    }
    if params.stock_quantity < 0 || params.reorder_threshold < 0 {
        return Err(ServerError::InvalidRequestBody("stock levels must not be negative".to_string()));
    }
    let product = db
        .insert_product(
            NewProduct::new(params.name, params.unit_price, StockQty::from(params.stock_quantity))
                .with_reorder_threshold(StockQty::from(params.reorder_threshold)),
        )
        .await?;
    info!("💻️ Product {} created with {}", product.id, product.stock_quantity);
    Ok(HttpResponse::Created().json(product))
}

route!(products => Get "/products" impl InventoryManagement);
pub async fn products<B: InventoryManagement>(db: web::Data<B>) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET /products");
    let products = db.fetch_products().await?;
    Ok(HttpResponse::Ok().json(products))
}

route!(product_by_id => Get "/products/{id}" impl InventoryManagement);
pub async fn product_by_id<B: InventoryManagement>(
    path: web::Path<i64>,
    db: web::Data<B>,
) -> Result<HttpResponse, ServerError> {
    let id = ProductId::from(path.into_inner());
    debug!("💻️ GET /products/{id}");
    let product = db
        .fetch_product(id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Product {id} does not exist")))?;
    Ok(HttpResponse::Ok().json(product))
}
