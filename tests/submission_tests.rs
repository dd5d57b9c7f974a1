mod common;

use checkout_flow::application::submitter::OrderSubmitter;
use checkout_flow::config::CheckoutConfig;
use checkout_flow::domain::order::TransactionStatus;
use checkout_flow::domain::ports::OrderStore;
use checkout_flow::domain::session::CheckoutStep;
use checkout_flow::error::CheckoutError;
use checkout_flow::infrastructure::in_memory::InMemoryOrderStore;
use common::{FailingSink, FlakyOrderStore, HarnessBuilder, RecordingSink, next_summary};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

#[tokio::test]
async fn test_submitting_confirmed_session_twice_returns_same_order() {
    let store = InMemoryOrderStore::new();
    let mut h = HarnessBuilder::new()
        .order_store(Arc::new(store.clone()))
        .build();
    h.to_review().await;

    let first = h.orchestrator.confirm().await.unwrap();
    let second = h.orchestrator.confirm().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(store.order_count().await, 1);

    // The submitter on its own is idempotent too.
    let submitter = OrderSubmitter::new(Arc::new(store.clone()), true);
    let mut session = h.orchestrator.session().clone();
    let third = submitter.submit(&mut session).await.unwrap();
    assert_eq!(third.order_id, first.order_id);
    assert_eq!(store.order_count().await, 1);
}

#[tokio::test]
async fn test_failed_submission_stays_at_review_and_retries() {
    let store = FlakyOrderStore::failing(2);
    let mut h = HarnessBuilder::new()
        .order_store(Arc::new(store.clone()))
        .build();
    h.to_review().await;

    for _ in 0..2 {
        let err = h.orchestrator.confirm().await.unwrap_err();
        assert!(matches!(err, CheckoutError::Submission(_)));
        assert!(err.is_retryable());
        assert_eq!(h.orchestrator.step(), CheckoutStep::Review);
        assert!(h.orchestrator.session().receipt.is_none());
    }

    let receipt = h.orchestrator.confirm().await.unwrap();
    assert_eq!(h.orchestrator.step(), CheckoutStep::Confirmation);
    assert_eq!(store.pending_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        store.transaction_status(receipt.transaction_id).await.unwrap(),
        Some(TransactionStatus::Confirmed)
    );
    assert_eq!(store.inner.order_count().await, 1);
}

#[tokio::test]
async fn test_order_failure_after_confirmed_transaction_retries_same_transaction() {
    let store = FlakyOrderStore::failing_orders(1);
    let mut h = HarnessBuilder::new()
        .order_store(Arc::new(store.clone()))
        .build();
    h.to_review().await;

    assert!(h.orchestrator.confirm().await.is_err());
    let tx = h.orchestrator.session().transaction_id.unwrap();

    let receipt = h.orchestrator.confirm().await.unwrap();
    assert_eq!(receipt.transaction_id, tx);
    assert_eq!(store.create_order_calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.inner.order_count().await, 1);
}

#[tokio::test]
async fn test_summary_is_delivered_after_confirmation() {
    let (sink, mut summaries) = RecordingSink::new();
    let mut h = HarnessBuilder::new().sink(Arc::new(sink)).build();
    h.to_review().await;
    let receipt = h.orchestrator.confirm().await.unwrap();

    let summary = next_summary(&mut summaries).await;
    assert_eq!(summary.order, receipt);
    assert_eq!(summary.payment.number, "**** **** **** 1111");
    assert_eq!(summary.items.len(), 2);
    assert_eq!(summary.shipping.country, "GB");
}

#[tokio::test]
async fn test_summary_reveals_number_when_configured() {
    let mut config = CheckoutConfig::default();
    config.notification.reveal_card_number = true;
    let (sink, mut summaries) = RecordingSink::new();
    let mut h = HarnessBuilder::new()
        .config(config)
        .sink(Arc::new(sink))
        .build();
    h.to_review().await;
    h.orchestrator.confirm().await.unwrap();

    assert_eq!(
        next_summary(&mut summaries).await.payment.number,
        "4111 1111 1111 1111"
    );
}

#[tokio::test]
async fn test_failed_delivery_never_blocks_confirmation() {
    let sink = FailingSink::default();
    let mut h = HarnessBuilder::new().sink(Arc::new(sink.clone())).build();
    h.to_review().await;

    let receipt = h.orchestrator.confirm().await.unwrap();
    assert_eq!(h.orchestrator.step(), CheckoutStep::Confirmation);
    assert_eq!(h.orchestrator.view().receipt, Some(receipt));

    tokio::time::timeout(Duration::from_secs(2), async {
        while sink.attempts.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    // Retrying confirmation does not deliver again.
    h.orchestrator.confirm().await.unwrap();
    tokio::task::yield_now().await;
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disabled_notification_delivers_nothing() {
    let mut config = CheckoutConfig::default();
    config.notification.enabled = false;
    let (sink, mut summaries) = RecordingSink::new();
    let mut h = HarnessBuilder::new()
        .config(config)
        .sink(Arc::new(sink))
        .build();
    h.to_review().await;
    h.orchestrator.confirm().await.unwrap();

    tokio::task::yield_now().await;
    assert!(summaries.try_recv().is_err());
}

#[tokio::test]
async fn test_failed_submission_delivers_nothing() {
    let (sink, mut summaries) = RecordingSink::new();
    let mut h = HarnessBuilder::new()
        .order_store(Arc::new(FlakyOrderStore::failing(1)))
        .sink(Arc::new(sink))
        .build();
    h.to_review().await;
    assert!(h.orchestrator.confirm().await.is_err());

    tokio::task::yield_now().await;
    assert!(summaries.try_recv().is_err());
}
