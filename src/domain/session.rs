use super::money::{Money, UnitPrice};
use crate::error::CheckoutError;
use super::order::{OrderReceipt, TransactionId};
use super::otp::ChallengeId;
use super::payment::PaymentDescriptor;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The steps of a checkout, in the order a buyer walks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStep {
    Shipping,
    Payment,
    Otp,
    Review,
    /// Terminal. A new checkout starts a new session.
    Confirmation,
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CheckoutStep::Shipping => "shipping",
            CheckoutStep::Payment => "payment",
            CheckoutStep::Otp => "otp",
            CheckoutStep::Review => "review",
            CheckoutStep::Confirmation => "confirmation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingRecord {
    pub full_name: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
}

impl ShippingRecord {
    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("full_name", &self.full_name),
            ("street", &self.street),
            ("city", &self.city),
            ("postal_code", &self.postal_code),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub name: String,
    pub unit_price: UnitPrice,
    pub quantity: u32,
}

impl LineItem {
    /// # Errors
    ///
    /// Returns [`CheckoutError::Validation`] if the line total overflows.
    pub fn total(&self) -> Result<Money, CheckoutError> {
        self.unit_price.times(self.quantity)
    }
}

/// How a stored payment came to be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "challenge")]
pub enum Verification {
    /// The one-time-code challenge with this id reached `Verified`.
    Challenge(ChallengeId),
    /// Configuration turned the code step off.
    Waived,
}

/// A payment descriptor together with the evidence that it was verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedPayment {
    pub descriptor: PaymentDescriptor,
    pub verification: Verification,
}

/// The mutable record of one checkout attempt.
///
/// Only the orchestrator holds a `CheckoutSession` mutably; everything else
/// sees it through `&CheckoutSession` or a view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutSession {
    pub id: Uuid,
    pub step: CheckoutStep,
    pub shipping: Option<ShippingRecord>,
    pub payment: Option<VerifiedPayment>,
    pub items: Vec<LineItem>,
    pub total: Money,
    pub currency: String,
    /// Pending transaction reused across submission retries.
    pub transaction_id: Option<TransactionId>,
    pub receipt: Option<OrderReceipt>,
}

impl CheckoutSession {
    /// Opens a session at the shipping step with the total fixed from `items`.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Validation`] if the order total overflows.
    pub fn new(items: Vec<LineItem>, currency: impl Into<String>) -> Result<Self, CheckoutError> {
        let total = Money::try_sum(items.iter().map(LineItem::total))?;
        Ok(Self {
            id: Uuid::new_v4(),
            step: CheckoutStep::Shipping,
            shipping: None,
            payment: None,
            items,
            total,
            currency: currency.into(),
            transaction_id: None,
            receipt: None,
        })
    }
}
