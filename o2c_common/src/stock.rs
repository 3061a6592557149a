use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------     StockQty       ----------------------------------------------------------
/// A count of stock units. Deltas may be negative; persisted stock levels never are.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct StockQty(i64);

op!(binary StockQty, Add, add);
op!(binary StockQty, Sub, sub);
op!(inplace StockQty, AddAssign, add_assign);
op!(inplace StockQty, SubAssign, sub_assign);
op!(unary StockQty, Neg, neg);

impl Sum for StockQty {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a stock quantity: {0}")]
pub struct StockQtyConversionError(String);

impl From<i64> for StockQty {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for StockQty {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for StockQty {}

impl TryFrom<u64> for StockQty {
    type Error = StockQtyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(StockQtyConversionError(format!("Value {} is too large to convert to StockQty", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for StockQty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} units", self.0)
    }
}

impl StockQty {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }
}

#[cfg(test)]
mod test {
    use super::StockQty;

    #[test]
    fn arithmetic() {
        let a = StockQty::from(10);
        let b = StockQty::from(3);
        assert_eq!(a + b, StockQty::from(13));
        assert_eq!(a - b, StockQty::from(7));
        assert_eq!(-b, StockQty::from(-3));
        let mut c = a;
        c -= b;
        assert_eq!(c, StockQty::from(7));
    }

    #[test]
    fn display() {
        assert_eq!(StockQty::from(42).to_string(), "42 units");
    }
}
