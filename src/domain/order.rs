use super::money::Money;
use super::payment::{CardBrand, PaymentDescriptor};
use super::session::{LineItem, ShippingRecord};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransactionId(pub Uuid);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub Uuid);

impl TransactionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Transaction lifecycle as tracked by the order store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Confirmed,
    Failed,
}

/// What a successful submission hands back to the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: OrderId,
    pub transaction_id: TransactionId,
    pub total: Money,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentSummary {
    pub holder_name: String,
    pub brand: CardBrand,
    /// Masked unless the notification config reveals full numbers.
    pub number: String,
    pub expiry: String,
}

impl PaymentSummary {
    pub fn from_descriptor(descriptor: &PaymentDescriptor, reveal_number: bool) -> Self {
        Self {
            holder_name: descriptor.holder_name().to_string(),
            brand: descriptor.brand(),
            number: if reveal_number {
                descriptor.number().to_string()
            } else {
                descriptor.masked_number()
            },
            expiry: format!(
                "{:02}/{}",
                descriptor.expiry_month(),
                descriptor.expiry_year()
            ),
        }
    }
}

/// Summary delivered to the notification side channel after confirmation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutSummary {
    pub shipping: ShippingRecord,
    pub payment: PaymentSummary,
    pub order: OrderReceipt,
    pub items: Vec<LineItem>,
}
