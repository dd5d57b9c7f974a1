use super::notifier::Notifier;
use super::submitter::OrderSubmitter;
use crate::config::CheckoutConfig;
use crate::domain::money::Money;
use crate::domain::order::{CheckoutSummary, OrderReceipt, PaymentSummary};
use crate::domain::otp::{
    ChallengeId, ChallengeState, DeliveryChannel, OtpChallenge, Outcome, format_countdown,
    normalize_pasted_code,
};
use crate::domain::payment::{CardSubmission, PaymentDescriptor};
use crate::domain::ports::{
    ClockRef, NotificationSinkRef, OrderStoreRef, SchedulerBox, ShippingValidatorBox,
    Subscription, VerifierBox,
};
use crate::domain::session::{
    CheckoutSession, CheckoutStep, LineItem, ShippingRecord, Verification, VerifiedPayment,
};
use crate::error::{CheckoutError, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Collaborators an orchestrator is wired with.
pub struct CheckoutDeps {
    pub clock: ClockRef,
    pub scheduler: SchedulerBox,
    pub verifier: VerifierBox,
    pub shipping_validator: ShippingValidatorBox,
    pub order_store: OrderStoreRef,
    pub notification_sink: NotificationSinkRef,
}

/// The challenge of the `otp` step and the capture it gates.
struct ActiveChallenge {
    challenge: OtpChallenge,
    descriptor: PaymentDescriptor,
    countdown: Option<Subscription>,
}

/// Read-only projection of the challenge for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OtpView {
    pub challenge_id: ChallengeId,
    pub channel: DeliveryChannel,
    pub state: ChallengeState,
    pub code_length: usize,
    pub attempts: u32,
    pub remaining_attempts: u32,
    pub remaining_seconds: u64,
    pub countdown: String,
    pub can_verify: bool,
    pub can_resend: bool,
}

/// Read-only projection of the session for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutView {
    pub session_id: Uuid,
    pub step: CheckoutStep,
    pub shipping: Option<ShippingRecord>,
    pub payment: Option<PaymentSummary>,
    pub items: Vec<LineItem>,
    pub total: Money,
    pub currency: String,
    pub otp: Option<OtpView>,
    pub blocked: bool,
    pub receipt: Option<OrderReceipt>,
}

/// Sequences one checkout: shipping, payment, otp, review, confirmation.
///
/// The orchestrator exclusively owns the [`CheckoutSession`]. Every action
/// takes `&mut self`, so session mutations are serialized by construction;
/// the [`CheckoutActor`](super::actor::CheckoutActor) adds the same
/// guarantee across tasks.
pub struct CheckoutOrchestrator {
    config: Arc<CheckoutConfig>,
    session: CheckoutSession,
    active: Option<ActiveChallenge>,
    blocked: bool,
    clock: ClockRef,
    scheduler: SchedulerBox,
    verifier: VerifierBox,
    shipping_validator: ShippingValidatorBox,
    submitter: OrderSubmitter,
    notifier: Notifier,
}

impl CheckoutOrchestrator {
    /// Starts a new session at the shipping step.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Validation`] if the items' total overflows.
    pub fn new(
        config: Arc<CheckoutConfig>,
        deps: CheckoutDeps,
        items: Vec<LineItem>,
    ) -> Result<Self> {
        let session = CheckoutSession::new(items, config.currency.clone())?;
        let notifier = if config.notification.enabled {
            Notifier::new(deps.notification_sink)
        } else {
            Notifier::disabled()
        };
        info!(session_id = %session.id, total = %session.total, "checkout started");
        Ok(Self {
            submitter: OrderSubmitter::new(deps.order_store, config.otp_required()),
            config,
            session,
            active: None,
            blocked: false,
            clock: deps.clock,
            scheduler: deps.scheduler,
            verifier: deps.verifier,
            shipping_validator: deps.shipping_validator,
            notifier,
        })
    }

    pub fn session(&self) -> &CheckoutSession {
        &self.session
    }

    pub fn step(&self) -> CheckoutStep {
        self.session.step
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    pub fn active_challenge(&self) -> Option<&OtpChallenge> {
        self.active.as_ref().map(|a| &a.challenge)
    }

    /// Whether a countdown subscription is currently held.
    pub fn countdown_active(&self) -> bool {
        self.active.as_ref().is_some_and(|a| a.countdown.is_some())
    }

    pub fn view(&self) -> CheckoutView {
        let now = self.clock.now();
        let otp = self.active.as_ref().map(|active| {
            let challenge = &active.challenge;
            let remaining_seconds = challenge.remaining_seconds(now);
            let state = challenge.state();
            OtpView {
                challenge_id: challenge.id(),
                channel: challenge.channel(),
                state,
                code_length: challenge.policy().code_length,
                attempts: challenge.attempts(),
                remaining_attempts: challenge.remaining_attempts(),
                remaining_seconds,
                countdown: format_countdown(remaining_seconds),
                can_verify: matches!(state, ChallengeState::Pending { deadline, .. } if now < deadline),
                can_resend: matches!(
                    state,
                    ChallengeState::Pending { .. } | ChallengeState::Expired { .. }
                ),
            }
        });
        CheckoutView {
            session_id: self.session.id,
            step: self.session.step,
            shipping: self.session.shipping.clone(),
            payment: self
                .session
                .payment
                .as_ref()
                .map(|p| PaymentSummary::from_descriptor(&p.descriptor, false)),
            items: self.session.items.clone(),
            total: self.session.total,
            currency: self.session.currency.clone(),
            otp,
            blocked: self.blocked,
            receipt: self.session.receipt.clone(),
        }
    }

    fn expect_step(&self, allowed: &[CheckoutStep], action: &'static str) -> Result<()> {
        if self.blocked {
            return Err(CheckoutError::Blocked);
        }
        if allowed.contains(&self.session.step) {
            Ok(())
        } else {
            Err(CheckoutError::InvalidTransition {
                from: self.session.step,
                action,
            })
        }
    }

    fn move_to(&mut self, step: CheckoutStep) {
        if step != CheckoutStep::Otp {
            // Leaving otp by any path drops the challenge and its countdown.
            self.active = None;
        }
        info!(session_id = %self.session.id, from = %self.session.step, to = %step, "checkout step");
        self.session.step = step;
    }

    /// `shipping -> payment`.
    pub fn submit_shipping(&mut self, record: ShippingRecord) -> Result<CheckoutStep> {
        self.expect_step(&[CheckoutStep::Shipping], "submit shipping details")?;
        self.shipping_validator.validate(&record)?;
        self.session.shipping = Some(record);
        self.move_to(CheckoutStep::Payment);
        Ok(self.session.step)
    }

    /// `payment -> otp`, or straight to `review` when verification is off.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Blocked`] once the session is blocked,
    /// [`CheckoutError::InvalidTransition`] outside the payment step and
    /// [`CheckoutError::Validation`] if the card cannot be captured.
    pub async fn submit_payment(&mut self, submission: CardSubmission) -> Result<CheckoutStep> {
        self.expect_step(&[CheckoutStep::Payment], "submit payment details")?;
        let descriptor = PaymentDescriptor::capture(submission)?;
        debug!(
            session_id = %self.session.id,
            brand = %descriptor.brand(),
            last_four = descriptor.last_four(),
            "payment captured"
        );

        if !self.config.otp_required() {
            self.session.payment = Some(VerifiedPayment {
                descriptor,
                verification: Verification::Waived,
            });
            self.move_to(CheckoutStep::Review);
            return Ok(self.session.step);
        }

        let challenge = OtpChallenge::start(
            self.config.otp_policy(),
            self.config.otp.channel,
            self.clock.now(),
        );
        self.verifier.issued(challenge.id()).await;
        let countdown = self
            .scheduler
            .subscribe(challenge.id(), self.config.tick_interval());
        info!(session_id = %self.session.id, challenge = %challenge.id(), "verification code issued");
        self.active = Some(ActiveChallenge {
            challenge,
            descriptor,
            countdown: Some(countdown),
        });
        self.move_to(CheckoutStep::Otp);
        Ok(self.session.step)
    }

    fn active_mut(&mut self, action: &'static str) -> Result<&mut ActiveChallenge> {
        self.expect_step(&[CheckoutStep::Otp], action)?;
        self.active.as_mut().ok_or(CheckoutError::InvalidTransition {
            from: CheckoutStep::Otp,
            action,
        })
    }

    /// Drops the countdown once the challenge stops counting down and
    /// latches the session-level block.
    fn settle(&mut self) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        if !active.challenge.is_counting_down() {
            active.countdown = None;
        }
        if active.challenge.is_blocked() && !self.blocked {
            warn!(session_id = %self.session.id, "verification blocked");
            self.blocked = true;
        }
    }

    /// Submits a candidate code. On acceptance the captured payment is stored
    /// as verified and the session moves to `review`.
    pub async fn submit_code(&mut self, candidate: &str) -> Result<Outcome> {
        let now = self.clock.now();
        let active = self.active_mut("submit a verification code")?;
        let submitted = active.challenge.submit(candidate, now);
        let id = active.challenge.id();
        self.settle();
        match submitted? {
            Outcome::AwaitingVerdict => {}
            other => return Ok(other),
        }

        let verdict = self.verifier.verify(id, candidate).await;
        let now = self.clock.now();
        let active = self.active_mut("complete verification")?;
        let outcome = active.challenge.complete(verdict, now);
        self.settle();
        let outcome = outcome?;

        match outcome {
            Outcome::Verified => {
                if let Some(active) = self.active.take() {
                    self.session.payment = Some(VerifiedPayment {
                        descriptor: active.descriptor,
                        verification: Verification::Challenge(id),
                    });
                }
                self.move_to(CheckoutStep::Review);
            }
            Outcome::Rejected { remaining } => {
                warn!(session_id = %self.session.id, remaining, "verification code rejected");
            }
            _ => {}
        }
        Ok(outcome)
    }

    /// Normalizes pasted text to at most `code_length` digits and submits it.
    pub async fn paste_code(&mut self, raw: &str) -> Result<Outcome> {
        let code = normalize_pasted_code(raw, self.config.otp.code_length);
        self.submit_code(&code).await
    }

    /// Issues a fresh code. A no-op once the code step has already been
    /// passed by verification.
    pub async fn resend_code(&mut self) -> Result<Outcome> {
        if !self.blocked
            && self.session.step == CheckoutStep::Review
            && matches!(
                self.session.payment.as_ref().map(|p| p.verification),
                Some(Verification::Challenge(_))
            )
        {
            debug!(session_id = %self.session.id, "resend after verification ignored");
            return Ok(Outcome::Unchanged);
        }

        let now = self.clock.now();
        let active = self.active_mut("resend the verification code")?;
        let outcome = active.challenge.resend(now);
        self.settle();
        let outcome = outcome?;

        if let Outcome::Reissued { .. } = outcome
            && let Some(active) = self.active.as_mut()
        {
            let id = active.challenge.id();
            // Replacing the subscription cancels the old countdown.
            active.countdown = Some(self.scheduler.subscribe(id, self.config.tick_interval()));
            self.verifier.issued(id).await;
            info!(session_id = %self.session.id, challenge = %id, "verification code reissued");
        }
        Ok(outcome)
    }

    /// Advances the countdown of the current challenge.
    pub fn tick(&mut self) -> Outcome {
        match self.active.as_ref() {
            Some(active) => {
                let id = active.challenge.id();
                self.on_tick(id)
            }
            None => Outcome::Unchanged,
        }
    }

    /// Handles a scheduler tick. Ticks for any challenge other than the
    /// active one are stale and ignored.
    pub fn on_tick(&mut self, challenge: ChallengeId) -> Outcome {
        let now = self.clock.now();
        let Some(active) = self.active.as_mut() else {
            return Outcome::Unchanged;
        };
        if self.session.step != CheckoutStep::Otp || active.challenge.id() != challenge {
            debug!(%challenge, "stale tick ignored");
            return Outcome::Unchanged;
        }
        let outcome = active.challenge.tick(now);
        if outcome == Outcome::Expired {
            info!(session_id = %self.session.id, %challenge, "verification code expired");
        }
        self.settle();
        outcome
    }

    /// `otp -> payment` or `review -> payment`. Accepted data stays until
    /// it is resubmitted.
    pub fn back_to_payment(&mut self) -> Result<CheckoutStep> {
        self.expect_step(
            &[CheckoutStep::Otp, CheckoutStep::Review],
            "return to payment",
        )?;
        self.move_to(CheckoutStep::Payment);
        Ok(self.session.step)
    }

    /// `review -> shipping` or `payment -> shipping`.
    pub fn edit_shipping(&mut self) -> Result<CheckoutStep> {
        self.expect_step(
            &[CheckoutStep::Payment, CheckoutStep::Review],
            "edit shipping details",
        )?;
        self.move_to(CheckoutStep::Shipping);
        Ok(self.session.step)
    }

    /// `review -> confirmation`. On failure the session stays at review and
    /// the error is retryable. Confirming an already confirmed session
    /// returns the existing receipt.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Blocked`] once the session is blocked,
    /// [`CheckoutError::InvalidTransition`] outside review, and whatever
    /// [`OrderSubmitter::submit`] reports.
    pub async fn confirm(&mut self) -> Result<OrderReceipt> {
        if self.session.step == CheckoutStep::Confirmation {
            return self.submitter.submit(&mut self.session).await;
        }
        self.expect_step(&[CheckoutStep::Review], "confirm the order")?;

        let receipt = self.submitter.submit(&mut self.session).await?;
        self.move_to(CheckoutStep::Confirmation);

        if let (Some(shipping), Some(payment)) = (&self.session.shipping, &self.session.payment) {
            let summary = CheckoutSummary {
                shipping: shipping.clone(),
                payment: PaymentSummary::from_descriptor(
                    &payment.descriptor,
                    self.config.notification.reveal_card_number,
                ),
                order: receipt.clone(),
                items: self.session.items.clone(),
            };
            // Detached; the outcome is only ever logged.
            let _ = self.notifier.dispatch(summary);
        }
        Ok(receipt)
    }

    /// Ends the session without confirmation. The countdown is cancelled
    /// and an unconfirmed transaction is marked failed.
    pub async fn abandon(mut self) {
        self.active = None;
        if let Err(e) = self.submitter.release(&self.session).await {
            warn!(session_id = %self.session.id, error = %e, "failed to release transaction");
        }
        info!(session_id = %self.session.id, step = %self.session.step, "checkout closed");
    }
}
