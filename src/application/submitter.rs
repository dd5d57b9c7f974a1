use crate::domain::order::{OrderId, OrderReceipt, TransactionId};
use crate::domain::ports::OrderStoreRef;
use crate::domain::session::{CheckoutSession, CheckoutStep, Verification};
use crate::error::{CheckoutError, Result};
use tracing::{info, warn};

/// Turns a verified session into an order through the external store.
pub struct OrderSubmitter {
    store: OrderStoreRef,
    otp_required: bool,
}

fn submission_error(error: CheckoutError) -> CheckoutError {
    match error {
        CheckoutError::Submission(_) => error,
        other => CheckoutError::Submission(other.to_string()),
    }
}

impl OrderSubmitter {
    /// `otp_required` decides whether a payment with waived verification
    /// may be submitted.
    pub fn new(store: OrderStoreRef, otp_required: bool) -> Self {
        Self {
            store,
            otp_required,
        }
    }

    /// Submits the session's order.
    ///
    /// Re-submitting a session that already holds a receipt returns that
    /// receipt. The pending transaction id is recorded on the session so a
    /// retry after a store failure reuses it. `session.step` is never
    /// touched.
    ///
    /// # Errors
    ///
    /// * [`CheckoutError::InvalidTransition`] if the session is not at review.
    /// * [`CheckoutError::Validation`] if the payment is missing, or waived
    ///   while verification is required.
    /// * [`CheckoutError::Submission`] if any order store call fails. These
    ///   are retryable.
    pub async fn submit(&self, session: &mut CheckoutSession) -> Result<OrderReceipt> {
        if let Some(receipt) = &session.receipt {
            return Ok(receipt.clone());
        }

        if session.step != CheckoutStep::Review {
            return Err(CheckoutError::InvalidTransition {
                from: session.step,
                action: "submit the order",
            });
        }

        let verification = session
            .payment
            .as_ref()
            .map(|p| p.verification)
            .ok_or_else(|| CheckoutError::Validation("No verified payment".to_string()))?;
        if verification == Verification::Waived && self.otp_required {
            return Err(CheckoutError::Validation(
                "Payment has not been verified".to_string(),
            ));
        }

        let transaction_id = match session.transaction_id {
            Some(id) => id,
            None => {
                let id = self
                    .store
                    .create_pending_transaction(session)
                    .await
                    .map_err(submission_error)?;
                session.transaction_id = Some(id);
                id
            }
        };

        let order_id = self
            .finalize(session, transaction_id)
            .await
            .map_err(|e| {
                warn!(session_id = %session.id, %transaction_id, error = %e, "order submission failed");
                submission_error(e)
            })?;

        let receipt = OrderReceipt {
            order_id,
            transaction_id,
            total: session.total,
            currency: session.currency.clone(),
        };
        info!(session_id = %session.id, %order_id, total = %receipt.total, "order created");
        session.receipt = Some(receipt.clone());
        Ok(receipt)
    }

    async fn finalize(
        &self,
        session: &CheckoutSession,
        transaction_id: TransactionId,
    ) -> Result<OrderId> {
        self.store.confirm_transaction(transaction_id).await?;
        self.store.create_order(session, transaction_id).await
    }

    /// Marks an unfinished transaction as failed. Used when a session is
    /// abandoned after a submission attempt.
    ///
    /// # Errors
    ///
    /// Propagates the order store's error from `fail_transaction`.
    pub async fn release(&self, session: &CheckoutSession) -> Result<()> {
        match (session.transaction_id, &session.receipt) {
            (Some(id), None) => self.store.fail_transaction(id).await,
            _ => Ok(()),
        }
    }
}
