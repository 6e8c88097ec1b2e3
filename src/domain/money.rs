use crate::error::OrderError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A monetary value, e.g. an order total or a refunded amount.
///
/// Wraps `rust_decimal::Decimal` so prices are never subject to binary
/// floating point rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Money(pub Decimal);

/// A strictly positive unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Serialize, Deserialize)]
pub struct UnitPrice(Decimal);

impl UnitPrice {
    pub fn new(value: Decimal) -> Result<Self, OrderError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(OrderError::Validation(
                "Unit price must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Subtotal for `quantity` units.
    pub fn times(&self, quantity: u32) -> Result<Money, OrderError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Money)
            .ok_or_else(overflow)
    }
}

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self, OrderError> {
        self.0.checked_add(rhs.0).map(Self).ok_or_else(overflow)
    }

    /// Adds up subtotals, failing instead of wrapping past `Decimal::MAX`.
    pub fn checked_sum<I>(amounts: I) -> Result<Self, OrderError>
    where
        I: IntoIterator<Item = Result<Self, OrderError>>,
    {
        amounts
            .into_iter()
            .try_fold(Self::ZERO, |total, amount| total.checked_add(amount?))
    }
}

fn overflow() -> OrderError {
    OrderError::Validation("Order total overflows".to_string())
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}
