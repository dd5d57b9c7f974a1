//! Cart and browsing-history persistence behind the key-value port.
//!
//! Both documents are stored as JSON arrays. A service loads the document,
//! applies one change and writes it back.

use crate::domain::cart::{BrowsingHistory, Cart, CartLine, ViewedProduct};
use crate::domain::ports::{KeyValueStore, KeyValueStoreRef};
use crate::error::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

pub const CART_KEY: &str = "cart";
pub const HISTORY_KEY: &str = "history";

async fn load<T: DeserializeOwned + Default>(store: &dyn KeyValueStore, key: &str) -> Result<T> {
    match store.get(key).await? {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(T::default()),
    }
}

async fn save<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    store.set(key, serde_json::to_string(value)?).await
}

#[derive(Clone)]
pub struct CartService {
    store: KeyValueStoreRef,
}

impl CartService {
    pub fn new(store: KeyValueStoreRef) -> Self {
        Self { store }
    }

    pub async fn cart(&self) -> Result<Cart> {
        load(self.store.as_ref(), CART_KEY).await
    }

    /// Adds a line, raising its quantity to the MOQ when needed.
    pub async fn add_item(&self, line: CartLine) -> Result<Cart> {
        let mut cart = self.cart().await?;
        debug!(product_id = %line.product_id, quantity = line.quantity, moq = line.moq, "cart add");
        cart.add_item(line);
        save(self.store.as_ref(), CART_KEY, &cart).await?;
        Ok(cart)
    }

    /// Returns the stored quantity, or `None` when the product is not in the
    /// cart.
    pub async fn update_quantity(&self, product_id: &str, quantity: u32) -> Result<Option<u32>> {
        let mut cart = self.cart().await?;
        let stored = cart.update_quantity(product_id, quantity);
        if stored.is_some() {
            save(self.store.as_ref(), CART_KEY, &cart).await?;
        }
        Ok(stored)
    }

    pub async fn remove(&self, product_id: &str) -> Result<Cart> {
        let mut cart = self.cart().await?;
        if cart.remove(product_id).is_some() {
            save(self.store.as_ref(), CART_KEY, &cart).await?;
        }
        Ok(cart)
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear(CART_KEY).await
    }
}

#[derive(Clone)]
pub struct HistoryService {
    store: KeyValueStoreRef,
    limit: usize,
}

impl HistoryService {
    pub fn new(store: KeyValueStoreRef, limit: usize) -> Self {
        Self { store, limit }
    }

    pub async fn history(&self) -> Result<BrowsingHistory> {
        load(self.store.as_ref(), HISTORY_KEY).await
    }

    pub async fn record_view(&self, product: ViewedProduct) -> Result<BrowsingHistory> {
        let mut history = self.history().await?;
        history.record(product, self.limit);
        save(self.store.as_ref(), HISTORY_KEY, &history).await?;
        Ok(history)
    }

    pub async fn clear(&self) -> Result<()> {
        self.store.clear(HISTORY_KEY).await
    }
}
