mod helpers;
pub mod op;
mod secret;
mod stock;

pub use helpers::parse_boolean_flag;
pub use secret::Secret;
pub use stock::{StockQty, StockQtyConversionError};
