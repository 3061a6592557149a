use o2c_common::StockQty;

use crate::db_types::Product;

/// The result of a successful conditional stock adjustment.
///
/// Carries the product row *after* the adjustment together with the level it held before, so that
/// callers can detect reorder-threshold crossings in either direction. Alerts fire on a crossing,
/// never on the level itself.
#[derive(Debug, Clone)]
pub struct StockAdjustment {
    pub product: Product,
    pub previous: StockQty,
}

impl StockAdjustment {
    pub fn new_level(&self) -> StockQty {
        self.product.stock_quantity
    }

    /// True if this adjustment took the stock level from at-or-above the reorder threshold to
    /// below it.
    pub fn crossed_below_threshold(&self) -> bool {
        self.previous >= self.product.reorder_threshold && self.new_level() < self.product.reorder_threshold
    }

    /// True if this adjustment lifted the stock level from below the reorder threshold to
    /// at-or-above it.
    pub fn crossed_above_threshold(&self) -> bool {
        self.previous < self.product.reorder_threshold && self.new_level() >= self.product.reorder_threshold
    }
}
