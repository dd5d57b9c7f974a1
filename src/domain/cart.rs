use super::money::{Money, UnitPrice};
use super::session::LineItem;
use crate::error::CheckoutError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: String,
    pub name: String,
    pub unit_price: UnitPrice,
    pub quantity: u32,
    /// Minimum order quantity. Quantities below it are raised to it.
    pub moq: u32,
}

impl CartLine {
    fn floor(&self) -> u32 {
        self.moq.max(1)
    }
}

/// Shopping cart keyed by product id, serialized as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn get(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Adds a line, merging with an existing line for the same product.
    /// The stored quantity never drops below the line's MOQ.
    pub fn add_item(&mut self, mut line: CartLine) {
        if let Some(existing) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == line.product_id)
        {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
            existing.moq = line.moq;
            existing.unit_price = line.unit_price;
            existing.quantity = existing.quantity.max(existing.floor());
        } else {
            line.quantity = line.quantity.max(line.floor());
            self.lines.push(line);
        }
    }

    /// Sets the quantity of an existing line, floored at its MOQ.
    /// Returns the stored quantity, or `None` if the product is not in the cart.
    pub fn update_quantity(&mut self, product_id: &str, quantity: u32) -> Option<u32> {
        let line = self.lines.iter_mut().find(|l| l.product_id == product_id)?;
        line.quantity = quantity.max(line.floor());
        Some(line.quantity)
    }

    pub fn remove(&mut self, product_id: &str) -> Option<CartLine> {
        let index = self.lines.iter().position(|l| l.product_id == product_id)?;
        Some(self.lines.remove(index))
    }

    /// # Errors
    ///
    /// Returns [`CheckoutError::Validation`] if the total overflows.
    pub fn total(&self) -> Result<Money, CheckoutError> {
        Money::try_sum(self.lines.iter().map(|l| l.unit_price.times(l.quantity)))
    }

    pub fn to_line_items(&self) -> Vec<LineItem> {
        self.lines
            .iter()
            .map(|l| LineItem {
                product_id: l.product_id.clone(),
                name: l.name.clone(),
                unit_price: l.unit_price,
                quantity: l.quantity,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewedProduct {
    pub product_id: String,
    pub name: String,
}

/// Recently viewed products, newest first, unique by product id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrowsingHistory {
    entries: Vec<ViewedProduct>,
}

impl BrowsingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[ViewedProduct] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Moves `product` to the front, dropping an older view of the same id
    /// and anything beyond `limit`.
    pub fn record(&mut self, product: ViewedProduct, limit: usize) {
        self.entries.retain(|e| e.product_id != product.product_id);
        self.entries.insert(0, product);
        self.entries.truncate(limit);
    }
}
