use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use o2c_common::StockQty;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------     ProductId       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct ProductId(pub i64);

impl From<i64> for ProductId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl ProductId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

//--------------------------------------      OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub i64);

impl From<i64> for OrderId {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn value(&self) -> i64 {
        self.0
    }
}

//--------------------------------------   OrderStatusType     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been accepted by the API and queued, but no fulfillment attempt has been made yet.
    Pending,
    /// The fulfillment consumer has dequeued the order and is reconciling it against inventory.
    Processing,
    /// Stock has been reserved and the order is complete.
    Fulfilled,
    /// There was not enough stock to fulfil the order. A retry has been scheduled.
    AwaitingRestock,
    /// The order could not be fulfilled within the retry budget, or failed a non-recoverable check.
    Failed,
}

impl OrderStatusType {
    /// Terminal orders are never mutated again; redeliveries for them are discarded.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Fulfilled | OrderStatusType::Failed)
    }

    /// The status state machine is monotonic: Pending → Processing → {Fulfilled | AwaitingRestock | Failed},
    /// with AwaitingRestock allowed back into Processing on a retry. Nothing ever returns to Pending.
    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        use OrderStatusType::*;
        match self {
            Pending => matches!(next, Processing),
            Processing => matches!(next, Processing | Fulfilled | AwaitingRestock | Failed),
            AwaitingRestock => matches!(next, Processing | Failed),
            Fulfilled | Failed => false,
        }
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Processing => write!(f, "Processing"),
            OrderStatusType::Fulfilled => write!(f, "Fulfilled"),
            OrderStatusType::AwaitingRestock => write!(f, "AwaitingRestock"),
            OrderStatusType::Failed => write!(f, "Failed"),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Fulfilled" => Ok(Self::Fulfilled),
            "AwaitingRestock" => Ok(Self::AwaitingRestock),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer_name: String,
    pub product_id: ProductId,
    pub quantity: StockQty,
    pub total_amount: f64,
    pub status: OrderStatusType,
    pub attempt_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      NewOrder       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    /// The customer placing the order
    pub customer_name: String,
    /// The product being ordered
    pub product_id: ProductId,
    /// How many units the customer wants. Must be positive.
    pub quantity: StockQty,
    /// The order value at submission time (unit price × quantity)
    pub total_amount: f64,
}

impl NewOrder {
    pub fn new<S: Into<String>>(customer_name: S, product_id: ProductId, quantity: StockQty) -> Self {
        Self { customer_name: customer_name.into(), product_id, quantity, total_amount: 0.0 }
    }

    pub fn with_total_amount(mut self, total_amount: f64) -> Self {
        self.total_amount = total_amount;
        self
    }
}

//--------------------------------------       Product       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub unit_price: f64,
    pub stock_quantity: StockQty,
    /// Stock level below which a downward crossing raises a low-stock alert.
    pub reorder_threshold: StockQty,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn is_below_threshold(&self) -> bool {
        self.stock_quantity < self.reorder_threshold
    }
}

//--------------------------------------     NewProduct      ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub unit_price: f64,
    pub stock_quantity: StockQty,
    pub reorder_threshold: StockQty,
}

impl NewProduct {
    pub fn new<S: Into<String>>(name: S, unit_price: f64, stock_quantity: StockQty) -> Self {
        Self { name: name.into(), unit_price, stock_quantity, reorder_threshold: StockQty::default() }
    }

    pub fn with_reorder_threshold(mut self, threshold: StockQty) -> Self {
        self.reorder_threshold = threshold;
        self
    }
}

#[cfg(test)]
mod test {
    use super::OrderStatusType::*;

    #[test]
    fn status_round_trip() {
        for status in [Pending, Processing, Fulfilled, AwaitingRestock, Failed] {
            assert_eq!(status.to_string().parse::<super::OrderStatusType>().unwrap(), status);
        }
    }

    #[test]
    fn transitions_are_monotonic() {
        assert!(Pending.can_transition_to(Processing));
        assert!(!Pending.can_transition_to(Fulfilled));
        assert!(Processing.can_transition_to(Fulfilled));
        assert!(Processing.can_transition_to(AwaitingRestock));
        assert!(AwaitingRestock.can_transition_to(Processing));
        assert!(AwaitingRestock.can_transition_to(Failed));
        assert!(!AwaitingRestock.can_transition_to(Pending));
        assert!(!Fulfilled.can_transition_to(Processing));
        assert!(!Failed.can_transition_to(Processing));
    }
}
