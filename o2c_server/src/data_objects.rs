use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Body of `POST /orders`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderParams {
    pub customer_name: String,
    pub product_id: i64,
    pub quantity: i64,
}

/// Body of `POST /products`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductParams {
    pub name: String,
    pub unit_price: f64,
    pub stock_quantity: i64,
    #[serde(default)]
    pub reorder_threshold: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}
