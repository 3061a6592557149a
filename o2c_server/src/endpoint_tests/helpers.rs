use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web::ServiceConfig, App};
use chrono::{TimeZone, Utc};
use log::debug;
use o2c_common::StockQty;
use o2c_engine::db_types::{Order, OrderId, OrderStatusType, Product, ProductId};
use serde::Serialize;

pub async fn get_request(path: &str, configure: fn(&mut ServiceConfig)) -> Result<(StatusCode, String), String> {
    let req = TestRequest::get().uri(path).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making GET request to {path}");
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

pub async fn post_request<B: Serialize>(
    path: &str,
    body: &B,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let req = TestRequest::post().uri(path).set_json(body).to_request();
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making POST request to {path}");
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

pub fn sample_product(id: i64, stock: i64) -> Product {
    Product {
        id: ProductId::from(id),
        name: format!("Product {id}"),
        unit_price: 25.0,
        stock_quantity: StockQty::from(stock),
        reorder_threshold: StockQty::from(2),
        created_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
    }
}

pub fn sample_order(id: i64, status: OrderStatusType) -> Order {
    Order {
        id: OrderId::from(id),
        customer_name: "Alice".to_string(),
        product_id: ProductId::from(1),
        quantity: StockQty::from(3),
        total_amount: 75.0,
        status,
        attempt_count: 0,
        created_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 2, 29, 13, 30, 0).unwrap(),
    }
}
