use crate::error::CheckoutError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A monetary value in the session currency.
///
/// Wraps `rust_decimal::Decimal` so totals never go through floating point.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(pub Decimal);

/// A strictly positive unit price.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct UnitPrice(Decimal);

impl UnitPrice {
    pub fn new(value: Decimal) -> Result<Self, CheckoutError> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(CheckoutError::Validation(
                "Unit price must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for UnitPrice {
    type Error = CheckoutError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UnitPrice> for Decimal {
    fn from(price: UnitPrice) -> Self {
        price.0
    }
}

impl From<UnitPrice> for Money {
    fn from(price: UnitPrice) -> Self {
        Self(price.0)
    }
}

impl UnitPrice {
    /// Price of `quantity` units.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Validation`] if the product does not fit in a
    /// `Decimal`.
    pub fn times(self, quantity: u32) -> Result<Money, CheckoutError> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Money)
            .ok_or_else(|| {
                CheckoutError::Validation(format!(
                    "line total overflows: {} x {quantity}",
                    self.0
                ))
            })
    }
}

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Sums amounts, failing instead of overflowing.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Validation`] if the running total leaves the
    /// `Decimal` range.
    pub fn try_sum<I>(amounts: I) -> Result<Self, CheckoutError>
    where
        I: IntoIterator<Item = Result<Self, CheckoutError>>,
    {
        amounts.into_iter().try_fold(Money::ZERO, |acc, amount| {
            acc.checked_add(amount?).ok_or_else(|| {
                CheckoutError::Validation("order total overflows".to_string())
            })
        })
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.round_dp(2))
    }
}
