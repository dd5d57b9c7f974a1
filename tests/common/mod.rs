#![allow(dead_code)]

use async_trait::async_trait;
use checkout_flow::application::orchestrator::{CheckoutDeps, CheckoutOrchestrator};
use checkout_flow::config::CheckoutConfig;
use checkout_flow::domain::money::UnitPrice;
use checkout_flow::domain::order::{CheckoutSummary, OrderId, TransactionId, TransactionStatus};
use checkout_flow::domain::payment::CardSubmission;
use checkout_flow::domain::ports::{
    NotificationSink, NotificationSinkRef, OrderStore, OrderStoreRef, RequiredFieldsValidator,
    VerifierBox,
};
use checkout_flow::domain::session::{CheckoutSession, LineItem, ShippingRecord};
use checkout_flow::error::{CheckoutError, Result};
use checkout_flow::infrastructure::clock::ManualClock;
use checkout_flow::infrastructure::in_memory::InMemoryOrderStore;
use checkout_flow::infrastructure::scheduler::ManualScheduler;
use checkout_flow::infrastructure::verifier::ShapeOnlyVerifier;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap()
}

pub fn shipping() -> ShippingRecord {
    ShippingRecord {
        full_name: "Ada Lovelace".into(),
        street: "12 St James's Square".into(),
        city: "London".into(),
        postal_code: "SW1Y 4JH".into(),
        country: "GB".into(),
    }
}

pub fn card() -> CardSubmission {
    CardSubmission {
        holder_name: "Ada Lovelace".into(),
        number: "4111 1111 1111 1111".into(),
        expiry_month: 9,
        expiry_year: 2030,
    }
}

pub fn items() -> Vec<LineItem> {
    vec![
        LineItem {
            product_id: "lamp".into(),
            name: "Desk lamp".into(),
            unit_price: UnitPrice::new(dec!(19.99)).unwrap(),
            quantity: 2,
        },
        LineItem {
            product_id: "bulb".into(),
            name: "Bulb".into(),
            unit_price: UnitPrice::new(dec!(3.50)).unwrap(),
            quantity: 4,
        },
    ]
}

/// Wires an orchestrator to manual time and ticks.
pub struct Harness {
    pub orchestrator: CheckoutOrchestrator,
    pub clock: ManualClock,
    pub scheduler: ManualScheduler,
}

pub struct HarnessBuilder {
    config: CheckoutConfig,
    verifier: VerifierBox,
    order_store: OrderStoreRef,
    sink: NotificationSinkRef,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            config: CheckoutConfig::default(),
            verifier: Box::new(ShapeOnlyVerifier),
            order_store: Arc::new(InMemoryOrderStore::new()),
            sink: Arc::new(RecordingSink::new().0),
        }
    }

    pub fn config(mut self, config: CheckoutConfig) -> Self {
        self.config = config;
        self
    }

    pub fn verifier(mut self, verifier: VerifierBox) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn order_store(mut self, store: OrderStoreRef) -> Self {
        self.order_store = store;
        self
    }

    pub fn sink(mut self, sink: NotificationSinkRef) -> Self {
        self.sink = sink;
        self
    }

    pub fn build(self) -> Harness {
        let clock = ManualClock::new(start_time());
        let scheduler = ManualScheduler::new();
        let deps = CheckoutDeps {
            clock: Arc::new(clock.clone()),
            scheduler: Box::new(scheduler.clone()),
            verifier: self.verifier,
            shipping_validator: Box::new(RequiredFieldsValidator),
            order_store: self.order_store,
            notification_sink: self.sink,
        };
        Harness {
            orchestrator: CheckoutOrchestrator::new(Arc::new(self.config), deps, items())
                .unwrap(),
            clock,
            scheduler,
        }
    }
}

impl Harness {
    /// Runs shipping and payment so the session waits at the code step.
    pub async fn to_otp(&mut self) {
        self.orchestrator.submit_shipping(shipping()).unwrap();
        self.orchestrator.submit_payment(card()).await.unwrap();
    }

    pub async fn to_review(&mut self) {
        self.to_otp().await;
        self.orchestrator.submit_code("123456").await.unwrap();
    }
}

/// Order store that fails a set number of `confirm_transaction` or
/// `create_order` calls before delegating to an in-memory store.
#[derive(Clone)]
pub struct FlakyOrderStore {
    pub inner: InMemoryOrderStore,
    confirm_failures: Arc<AtomicUsize>,
    order_failures: Arc<AtomicUsize>,
    pub pending_calls: Arc<AtomicUsize>,
    pub create_order_calls: Arc<AtomicUsize>,
}

fn take_failure(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl FlakyOrderStore {
    /// Fails the first `times` confirmations; the transaction stays pending.
    pub fn failing(times: usize) -> Self {
        Self::new(times, 0)
    }

    /// Fails the first `times` order creations after a confirmed transaction.
    pub fn failing_orders(times: usize) -> Self {
        Self::new(0, times)
    }

    fn new(confirm_failures: usize, order_failures: usize) -> Self {
        Self {
            inner: InMemoryOrderStore::new(),
            confirm_failures: Arc::new(AtomicUsize::new(confirm_failures)),
            order_failures: Arc::new(AtomicUsize::new(order_failures)),
            pending_calls: Arc::new(AtomicUsize::new(0)),
            create_order_calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl OrderStore for FlakyOrderStore {
    async fn create_pending_transaction(&self, session: &CheckoutSession) -> Result<TransactionId> {
        self.pending_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.create_pending_transaction(session).await
    }

    async fn confirm_transaction(&self, transaction_id: TransactionId) -> Result<()> {
        if take_failure(&self.confirm_failures) {
            return Err(CheckoutError::Submission("payment gateway timeout".into()));
        }
        self.inner.confirm_transaction(transaction_id).await
    }

    async fn create_order(
        &self,
        session: &CheckoutSession,
        transaction_id: TransactionId,
    ) -> Result<OrderId> {
        self.create_order_calls.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.order_failures) {
            return Err(CheckoutError::Submission("order service unavailable".into()));
        }
        self.inner.create_order(session, transaction_id).await
    }

    async fn fail_transaction(&self, transaction_id: TransactionId) -> Result<()> {
        self.inner.fail_transaction(transaction_id).await
    }

    async fn transaction_status(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<TransactionStatus>> {
        self.inner.transaction_status(transaction_id).await
    }
}

/// Forwards every delivered summary to a channel.
pub struct RecordingSink {
    tx: mpsc::UnboundedSender<CheckoutSummary>,
}

impl RecordingSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CheckoutSummary>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn deliver(&self, summary: &CheckoutSummary) -> Result<()> {
        // Nobody listening is fine.
        let _ = self.tx.send(summary.clone());
        Ok(())
    }
}

/// Always fails, counting attempts.
#[derive(Default, Clone)]
pub struct FailingSink {
    pub attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl NotificationSink for FailingSink {
    async fn deliver(&self, _summary: &CheckoutSummary) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(CheckoutError::NotificationDelivery("smtp down".into()))
    }
}

pub async fn next_summary(rx: &mut mpsc::UnboundedReceiver<CheckoutSummary>) -> CheckoutSummary {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("summary not delivered in time")
        .expect("sink dropped")
}

/// Writes a checkout script with the `event,a,b,c,d` header.
pub fn write_script(path: &Path, rows: &[&[&str]]) -> std::result::Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    wtr.write_record(["event", "a", "b", "c", "d"])?;
    for row in rows {
        wtr.write_record(*row)?;
    }
    wtr.flush()?;
    Ok(())
}
