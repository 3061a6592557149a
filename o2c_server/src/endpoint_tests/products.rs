use actix_web::{http::StatusCode, web, web::ServiceConfig};

use super::{
    helpers::{get_request, post_request, sample_product},
    mocks::MockFulfillmentDb,
};
use crate::{
    data_objects::ProductParams,
    routes::{NewProductRoute, ProductByIdRoute, ProductsRoute},
};

#[actix_web::test]
async fn create_product() {
    let _ = env_logger::try_init().ok();
    let params =
        ProductParams { name: "Widget".to_string(), unit_price: 25.0, stock_quantity: 100, reorder_threshold: 10 };
    let (status, body) = post_request("/products", &params, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::CREATED);
    let product: serde_json::Value = serde_json::from_str(&body).expect("Body was not JSON");
    assert_eq!(product["name"], "Widget");
    assert_eq!(product["stock_quantity"], 100);
}

#[actix_web::test]
async fn create_product_with_negative_stock_is_rejected() {
    let _ = env_logger::try_init().ok();
    let params =
        ProductParams { name: "Widget".to_string(), unit_price: 25.0, stock_quantity: -1, reorder_threshold: 0 };
    let (status, body) = post_request("/products", &params, configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("must not be negative"));
}

#[actix_web::test]
async fn fetch_products() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/products", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let products: serde_json::Value = serde_json::from_str(&body).expect("Body was not JSON");
    assert_eq!(products.as_array().map(|a| a.len()), Some(2));
}

#[actix_web::test]
async fn fetch_missing_product_is_a_404() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/products/99", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Product #99 does not exist"));
}

fn configure(cfg: &mut ServiceConfig) {
    let mut db = MockFulfillmentDb::new();
    db.expect_fetch_products().returning(|| Ok(vec![sample_product(1, 100), sample_product(2, 5)]));
    db.expect_fetch_product().returning(|id| {
        if id.value() == 1 {
            Ok(Some(sample_product(1, 100)))
        } else {
            Ok(None)
        }
    });
    db.expect_insert_product().returning(|new_product| {
        let mut product = sample_product(1, 0);
        product.name = new_product.name;
        product.unit_price = new_product.unit_price;
        product.stock_quantity = new_product.stock_quantity;
        product.reorder_threshold = new_product.reorder_threshold;
        Ok(product)
    });
    cfg.service(NewProductRoute::<MockFulfillmentDb>::new())
        .service(ProductsRoute::<MockFulfillmentDb>::new())
        .service(ProductByIdRoute::<MockFulfillmentDb>::new())
        .app_data(web::Data::new(db));
}
