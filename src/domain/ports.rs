use super::order::{CheckoutSummary, OrderId, TransactionId, TransactionStatus};
use super::otp::{ChallengeId, Verdict};
use super::session::{CheckoutSession, ShippingRecord};
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Cancels a countdown when dropped.
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Drives the countdown of a challenge with periodic ticks.
pub trait Scheduler: Send + Sync {
    fn subscribe(&self, challenge: ChallengeId, period: Duration) -> Subscription;
}

/// Decides whether a well-formed candidate code is the issued one.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify(&self, challenge: ChallengeId, candidate: &str) -> Verdict;

    /// Called when a code is issued (start or resend).
    async fn issued(&self, _challenge: ChallengeId) {}
}

/// Collaborator-side shipping validation.
pub trait ShippingValidator: Send + Sync {
    fn validate(&self, record: &ShippingRecord) -> Result<()>;
}

/// Accepts any record with every field filled in.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequiredFieldsValidator;

impl ShippingValidator for RequiredFieldsValidator {
    fn validate(&self, record: &ShippingRecord) -> Result<()> {
        let missing = record.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(CheckoutError::Validation(format!(
                "Missing shipping fields: {}",
                missing.join(", ")
            )))
        }
    }
}

/// External order store. Every call must be idempotent when retried with
/// the same transaction id.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn create_pending_transaction(&self, session: &CheckoutSession) -> Result<TransactionId>;
    async fn confirm_transaction(&self, transaction_id: TransactionId) -> Result<()>;
    async fn create_order(
        &self,
        session: &CheckoutSession,
        transaction_id: TransactionId,
    ) -> Result<OrderId>;
    async fn fail_transaction(&self, transaction_id: TransactionId) -> Result<()>;
    async fn transaction_status(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<TransactionStatus>>;
}

/// Best-effort delivery of a checkout summary.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn deliver(&self, summary: &CheckoutSummary) -> Result<()>;
}

/// Key-addressed string storage for cart and history.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: String) -> Result<()>;
    async fn clear(&self, key: &str) -> Result<()>;
}

pub type ClockRef = Arc<dyn Clock>;
pub type SchedulerBox = Box<dyn Scheduler>;
pub type VerifierBox = Box<dyn Verifier>;
pub type ShippingValidatorBox = Box<dyn ShippingValidator>;
pub type OrderStoreRef = Arc<dyn OrderStore>;
pub type NotificationSinkRef = Arc<dyn NotificationSink>;
pub type KeyValueStoreRef = Arc<dyn KeyValueStore>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_subscription_cancels_once() {
        let cancelled = Arc::new(AtomicUsize::new(0));
        let counter = cancelled.clone();
        let subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        subscription.cancel();
        assert_eq!(cancelled.load(Ordering::SeqCst), 1);

        let counter = cancelled.clone();
        drop(Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(cancelled.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_required_fields_validator() {
        let mut record = ShippingRecord {
            full_name: "Ada".into(),
            street: "1 Analytical Way".into(),
            city: "London".into(),
            postal_code: "N1".into(),
            country: "GB".into(),
        };
        assert!(RequiredFieldsValidator.validate(&record).is_ok());

        record.city.clear();
        let err = RequiredFieldsValidator.validate(&record).unwrap_err();
        assert!(err.to_string().contains("city"));
    }
}
