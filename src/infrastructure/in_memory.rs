use crate::domain::money::Money;
use crate::domain::order::{OrderId, TransactionId, TransactionStatus};
use crate::domain::ports::{KeyValueStore, OrderStore};
use crate::domain::session::{CheckoutSession, LineItem};
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub session_id: Uuid,
    pub amount: Money,
    pub currency: String,
    pub status: TransactionStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub id: OrderId,
    pub transaction_id: TransactionId,
    pub session_id: Uuid,
    pub items: Vec<LineItem>,
    pub total: Money,
}

#[derive(Debug, Default)]
struct Ledger {
    transactions: HashMap<TransactionId, TransactionRecord>,
    pending_by_session: HashMap<Uuid, TransactionId>,
    orders_by_transaction: HashMap<TransactionId, OrderRecord>,
}

/// A thread-safe in-memory order store.
///
/// Every operation is idempotent per transaction id: creating an order for
/// a transaction that already has one returns the existing order.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    ledger: Arc<RwLock<Ledger>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn order_count(&self) -> usize {
        self.ledger.read().await.orders_by_transaction.len()
    }

    pub async fn orders(&self) -> Vec<OrderRecord> {
        self.ledger
            .read()
            .await
            .orders_by_transaction
            .values()
            .cloned()
            .collect()
    }

    pub async fn transaction(&self, id: TransactionId) -> Option<TransactionRecord> {
        self.ledger.read().await.transactions.get(&id).cloned()
    }
}

fn unknown(id: TransactionId) -> CheckoutError {
    CheckoutError::Submission(format!("Unknown transaction {id}"))
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create_pending_transaction(&self, session: &CheckoutSession) -> Result<TransactionId> {
        let mut ledger = self.ledger.write().await;
        if let Some(id) = ledger.pending_by_session.get(&session.id).copied()
            && ledger
                .transactions
                .get(&id)
                .is_some_and(|tx| tx.status != TransactionStatus::Failed)
        {
            return Ok(id);
        }

        let id = TransactionId::new();
        ledger.transactions.insert(
            id,
            TransactionRecord {
                id,
                session_id: session.id,
                amount: session.total,
                currency: session.currency.clone(),
                status: TransactionStatus::Pending,
            },
        );
        ledger.pending_by_session.insert(session.id, id);
        Ok(id)
    }

    async fn confirm_transaction(&self, transaction_id: TransactionId) -> Result<()> {
        let mut ledger = self.ledger.write().await;
        let tx = ledger
            .transactions
            .get_mut(&transaction_id)
            .ok_or_else(|| unknown(transaction_id))?;
        match tx.status {
            TransactionStatus::Failed => Err(CheckoutError::Submission(format!(
                "Transaction {transaction_id} already failed"
            ))),
            _ => {
                tx.status = TransactionStatus::Confirmed;
                Ok(())
            }
        }
    }

    async fn create_order(
        &self,
        session: &CheckoutSession,
        transaction_id: TransactionId,
    ) -> Result<OrderId> {
        let mut ledger = self.ledger.write().await;
        if !ledger.transactions.contains_key(&transaction_id) {
            return Err(unknown(transaction_id));
        }
        if let Some(existing) = ledger.orders_by_transaction.get(&transaction_id) {
            return Ok(existing.id);
        }

        let order = OrderRecord {
            id: OrderId::new(),
            transaction_id,
            session_id: session.id,
            items: session.items.clone(),
            total: session.total,
        };
        let id = order.id;
        ledger.orders_by_transaction.insert(transaction_id, order);
        Ok(id)
    }

    async fn fail_transaction(&self, transaction_id: TransactionId) -> Result<()> {
        let mut ledger = self.ledger.write().await;
        let tx = ledger
            .transactions
            .get_mut(&transaction_id)
            .ok_or_else(|| unknown(transaction_id))?;
        // A confirmed transaction stays confirmed.
        if tx.status == TransactionStatus::Pending {
            tx.status = TransactionStatus::Failed;
        }
        Ok(())
    }

    async fn transaction_status(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<TransactionStatus>> {
        let ledger = self.ledger.read().await;
        Ok(ledger.transactions.get(&transaction_id).map(|tx| tx.status))
    }
}

/// A thread-safe in-memory key-value store.
#[derive(Default, Clone)]
pub struct InMemoryKeyValueStore {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::UnitPrice;
    use rust_decimal_macros::dec;

    fn session() -> CheckoutSession {
        CheckoutSession::new(
            vec![LineItem {
                product_id: "p1".into(),
                name: "Widget".into(),
                unit_price: UnitPrice::new(dec!(5.0)).unwrap(),
                quantity: 2,
            }],
            "USD",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_pending_transaction_reused_per_session() {
        let store = InMemoryOrderStore::new();
        let session = session();

        let first = store.create_pending_transaction(&session).await.unwrap();
        let second = store.create_pending_transaction(&session).await.unwrap();
        assert_eq!(first, second);

        let record = store.transaction(first).await.unwrap();
        assert_eq!(record.amount, Money::new(dec!(10.0)));
        assert_eq!(record.status, TransactionStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_order_idempotent_per_transaction() {
        let store = InMemoryOrderStore::new();
        let session = session();
        let tx = store.create_pending_transaction(&session).await.unwrap();

        let first = store.create_order(&session, tx).await.unwrap();
        let second = store.create_order(&session, tx).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(store.order_count().await, 1);
    }

    #[tokio::test]
    async fn test_transaction_status_progression() {
        let store = InMemoryOrderStore::new();
        let session = session();
        let tx = store.create_pending_transaction(&session).await.unwrap();

        store.confirm_transaction(tx).await.unwrap();
        store.confirm_transaction(tx).await.unwrap();
        store.fail_transaction(tx).await.unwrap();
        assert_eq!(
            store.transaction_status(tx).await.unwrap(),
            Some(TransactionStatus::Confirmed)
        );
    }

    #[tokio::test]
    async fn test_failed_transaction_cannot_confirm() {
        let store = InMemoryOrderStore::new();
        let session = session();
        let tx = store.create_pending_transaction(&session).await.unwrap();

        store.fail_transaction(tx).await.unwrap();
        assert!(matches!(
            store.confirm_transaction(tx).await,
            Err(CheckoutError::Submission(_))
        ));

        // A new attempt for the same session gets a fresh transaction.
        let retry = store.create_pending_transaction(&session).await.unwrap();
        assert_ne!(retry, tx);
    }

    #[tokio::test]
    async fn test_unknown_transaction() {
        let store = InMemoryOrderStore::new();
        let result = store.create_order(&session(), TransactionId::new()).await;
        assert!(matches!(result, Err(CheckoutError::Submission(_))));
        assert_eq!(
            store.transaction_status(TransactionId::new()).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_in_memory_key_value_store() {
        let store = InMemoryKeyValueStore::new();
        assert!(store.get("cart").await.unwrap().is_none());

        store.set("cart", "[]".to_string()).await.unwrap();
        assert_eq!(store.get("cart").await.unwrap().as_deref(), Some("[]"));

        store.clear("cart").await.unwrap();
        assert!(store.get("cart").await.unwrap().is_none());
    }
}
