use actix_web::{http::StatusCode, web, web::ServiceConfig};
use o2c_engine::db_types::{OrderId, OrderStatusType};

use super::{
    helpers::{get_request, post_request, sample_order, sample_product},
    mocks::{MockBroker, MockFulfillmentDb},
};
use crate::{
    data_objects::OrderParams,
    routes::{OrderByIdRoute, OrdersRoute, RepublishOrderRoute, SubmitOrderRoute},
};

#[actix_web::test]
async fn fetch_orders() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/orders", configure_listing).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let orders: serde_json::Value = serde_json::from_str(&body).expect("Body was not JSON");
    assert_eq!(orders.as_array().map(|a| a.len()), Some(2));
    assert_eq!(orders[0]["id"], 1);
    assert_eq!(orders[1]["status"], "Fulfilled");
}

#[actix_web::test]
async fn fetch_order_by_id() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/orders/1", configure_listing).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let order: serde_json::Value = serde_json::from_str(&body).expect("Body was not JSON");
    assert_eq!(order["id"], 1);
    assert_eq!(order["customer_name"], "Alice");
}

#[actix_web::test]
async fn fetch_missing_order_is_a_404() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/orders/99", configure_listing).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Order #99 does not exist"));
}

#[actix_web::test]
async fn submit_order_stores_and_queues() {
    let _ = env_logger::try_init().ok();
    let params = OrderParams { customer_name: "Alice".to_string(), product_id: 1, quantity: 3 };
    let (status, body) = post_request("/orders", &params, configure_submission).await.expect("Request failed");
    assert_eq!(status, StatusCode::CREATED);
    let order: serde_json::Value = serde_json::from_str(&body).expect("Body was not JSON");
    assert_eq!(order["id"], 42);
    assert_eq!(order["status"], "Pending");
}

#[actix_web::test]
async fn submit_order_for_unknown_product_is_a_404() {
    let _ = env_logger::try_init().ok();
    let params = OrderParams { customer_name: "Alice".to_string(), product_id: 999, quantity: 3 };
    let (status, body) = post_request("/orders", &params, configure_submission).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Product #999 does not exist"));
}

#[actix_web::test]
async fn submit_order_with_bad_quantity_is_rejected() {
    let _ = env_logger::try_init().ok();
    let params = OrderParams { customer_name: "Alice".to_string(), product_id: 1, quantity: 0 };
    let (status, body) = post_request("/orders", &params, configure_submission).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("quantity must be positive"));
}

#[actix_web::test]
async fn republish_requeues_a_parked_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/orders/7/republish", &(), configure_republish).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("requeued"));
}

#[actix_web::test]
async fn republish_refuses_a_terminal_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/orders/8/republish", &(), configure_republish).await.expect("Request failed");
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("already Fulfilled"));
}

fn configure_listing(cfg: &mut ServiceConfig) {
    let mut db = MockFulfillmentDb::new();
    db.expect_fetch_orders().returning(|| {
        Ok(vec![sample_order(1, OrderStatusType::Pending), sample_order(2, OrderStatusType::Fulfilled)])
    });
    db.expect_fetch_order().returning(|id| {
        if id == OrderId::from(1) {
            Ok(Some(sample_order(1, OrderStatusType::Pending)))
        } else {
            Ok(None)
        }
    });
    cfg.service(OrdersRoute::<MockFulfillmentDb>::new())
        .service(OrderByIdRoute::<MockFulfillmentDb>::new())
        .app_data(web::Data::new(db));
}

fn configure_submission(cfg: &mut ServiceConfig) {
    let mut db = MockFulfillmentDb::new();
    db.expect_fetch_product().returning(|id| {
        if id.value() == 1 {
            Ok(Some(sample_product(1, 10)))
        } else {
            Ok(None)
        }
    });
    db.expect_insert_order().returning(|new_order| {
        let mut order = sample_order(42, OrderStatusType::Pending);
        order.customer_name = new_order.customer_name;
        order.quantity = new_order.quantity;
        order.total_amount = new_order.total_amount;
        Ok(order)
    });
    let mut broker = MockBroker::new();
    broker.expect_publish().withf(|message| message.order_id == OrderId::from(42)).returning(|_| Ok(()));
    cfg.service(SubmitOrderRoute::<MockFulfillmentDb, MockBroker>::new())
        .app_data(web::Data::new(db))
        .app_data(web::Data::new(broker));
}

fn configure_republish(cfg: &mut ServiceConfig) {
    let mut db = MockFulfillmentDb::new();
    db.expect_fetch_order().returning(|id| {
        if id == OrderId::from(7) {
            let mut order = sample_order(7, OrderStatusType::AwaitingRestock);
            order.attempt_count = 2;
            Ok(Some(order))
        } else {
            Ok(Some(sample_order(8, OrderStatusType::Fulfilled)))
        }
    });
    let mut broker = MockBroker::new();
    // Only the parked order may be republished, and with its spent attempts carried over.
    broker
        .expect_publish()
        .withf(|message| message.order_id == OrderId::from(7) && message.attempt_count == 2)
        .returning(|_| Ok(()));
    cfg.service(RepublishOrderRoute::<MockFulfillmentDb, MockBroker>::new())
        .app_data(web::Data::new(db))
        .app_data(web::Data::new(broker));
}
