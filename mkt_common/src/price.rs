use std::fmt::Display;

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// Minor units per major currency unit (cents per dollar).
pub const CURRENCY_MINOR_UNITS: i64 = 100;

//--------------------------------------       Price        ---------------------------------------------------------
/// A monetary amount, held as an exact count of minor currency units.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Price(i64);

op!(binary Price, Add, add);
op!(binary Price, Sub, sub);
op!(inplace Price, AddAssign, add_assign);
op!(inplace Price, SubAssign, sub_assign);
op!(unary Price, Neg, neg);

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a price: {0}")]
pub struct PriceConversionError(String);

impl From<i64> for Price {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Price {
    type Error = PriceConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| PriceConversionError(format!("{value} is too large to convert to a Price")))
    }
}

impl Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = CURRENCY_MINOR_UNITS.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / units, abs % units)
    }
}

impl Price {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// The exact total of `prices`, or `None` if it does not fit in a `Price`.
    pub fn checked_sum<I: IntoIterator<Item = Price>>(prices: I) -> Option<Self> {
        prices.into_iter().try_fold(Self::default(), Self::checked_add)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}
