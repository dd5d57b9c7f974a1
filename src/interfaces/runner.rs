use super::csv::script_reader::ScriptEvent;
use super::report::CheckoutReport;
use crate::application::actor::{CheckoutActor, CheckoutHandle};
use crate::application::orchestrator::{CheckoutDeps, CheckoutOrchestrator};
use crate::application::storefront::{CartService, HistoryService};
use crate::config::CheckoutConfig;
use crate::domain::ports::{
    KeyValueStoreRef, NotificationSinkRef, OrderStoreRef, RequiredFieldsValidator, VerifierBox,
};
use crate::error::{CheckoutError, Result};
use crate::infrastructure::clock::ManualClock;
use crate::infrastructure::scheduler::TokioScheduler;
use crate::infrastructure::verifier::ShapeOnlyVerifier;
use chrono::TimeDelta;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct RunningCheckout {
    handle: CheckoutHandle,
    task: JoinHandle<()>,
}

/// Replays a checkout script against the storefront services and one
/// checkout session.
///
/// Script time is simulated: `wait` advances a [`ManualClock`] and ticks
/// the session, so expiry does not depend on how fast the script runs.
pub struct ScriptRunner {
    config: Arc<CheckoutConfig>,
    clock: ManualClock,
    order_store: OrderStoreRef,
    notification_sink: NotificationSinkRef,
    verifier: Option<VerifierBox>,
    cart: CartService,
    history: HistoryService,
    checkout: Option<RunningCheckout>,
}

impl ScriptRunner {
    pub fn new(
        config: Arc<CheckoutConfig>,
        store: KeyValueStoreRef,
        order_store: OrderStoreRef,
        notification_sink: NotificationSinkRef,
    ) -> Self {
        let history = HistoryService::new(store.clone(), config.storefront.history_limit);
        Self {
            config,
            clock: ManualClock::default(),
            order_store,
            notification_sink,
            verifier: None,
            cart: CartService::new(store),
            history,
            checkout: None,
        }
    }

    /// Replaces the default shape-only verifier for the session.
    pub fn with_verifier(mut self, verifier: VerifierBox) -> Self {
        self.verifier = Some(verifier);
        self
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Starts the session on first use, snapshotting the current cart.
    async fn checkout(&mut self) -> Result<CheckoutHandle> {
        if let Some(running) = &self.checkout {
            return Ok(running.handle.clone());
        }

        let items = self.cart.cart().await?.to_line_items();
        let (scheduler, ticks) = TokioScheduler::new();
        let deps = CheckoutDeps {
            clock: Arc::new(self.clock.clone()),
            scheduler: Box::new(scheduler),
            verifier: self
                .verifier
                .take()
                .unwrap_or_else(|| Box::new(ShapeOnlyVerifier)),
            shipping_validator: Box::new(RequiredFieldsValidator),
            order_store: self.order_store.clone(),
            notification_sink: self.notification_sink.clone(),
        };
        let orchestrator = CheckoutOrchestrator::new(self.config.clone(), deps, items)?;
        let (handle, task) = CheckoutActor::spawn(orchestrator, ticks);
        self.checkout = Some(RunningCheckout {
            handle: handle.clone(),
            task,
        });
        Ok(handle)
    }

    /// Applies one event. A rejected action leaves the session where it was.
    pub async fn apply(&mut self, event: ScriptEvent) -> Result<()> {
        if !event.is_checkout() {
            match event {
                ScriptEvent::AddItem(line) => {
                    self.cart.add_item(line).await?;
                }
                ScriptEvent::View(product) => {
                    self.history.record_view(product).await?;
                }
                _ => {}
            }
            return Ok(());
        }

        let checkout = self.checkout().await?;
        match event {
            ScriptEvent::Shipping(record) => {
                let step = checkout.submit_shipping(record).await?;
                debug!(%step, "shipping accepted");
            }
            ScriptEvent::Payment(card) => {
                let step = checkout.submit_payment(card).await?;
                debug!(%step, "payment accepted");
            }
            ScriptEvent::Code(code) => {
                let outcome = checkout.submit_code(code).await?;
                debug!(?outcome, "code submitted");
            }
            ScriptEvent::Paste(raw) => {
                let outcome = checkout.paste_code(raw).await?;
                debug!(?outcome, "code pasted");
            }
            ScriptEvent::Resend => {
                let outcome = checkout.resend_code().await?;
                debug!(?outcome, "code resent");
            }
            ScriptEvent::Wait(seconds) => {
                i64::try_from(seconds)
                    .ok()
                    .and_then(TimeDelta::try_seconds)
                    .and_then(|by| self.clock.advance(by))
                    .ok_or_else(|| {
                        CheckoutError::Validation(format!("wait: {seconds}s is out of range"))
                    })?;
                let outcome = checkout.tick().await?;
                debug!(seconds, ?outcome, "time advanced");
            }
            ScriptEvent::Back | ScriptEvent::EditPayment => {
                checkout.back_to_payment().await?;
            }
            ScriptEvent::EditShipping => {
                checkout.edit_shipping().await?;
            }
            ScriptEvent::Confirm => {
                let receipt = checkout.confirm().await?;
                info!(order_id = %receipt.order_id, total = %receipt.total, "order confirmed");
            }
            ScriptEvent::AddItem(_) | ScriptEvent::View(_) => {}
        }
        Ok(())
    }

    /// Closes the session, if any, and collects the final state.
    pub async fn finish(self) -> Result<CheckoutReport> {
        let checkout = match self.checkout {
            Some(RunningCheckout { handle, task }) => {
                let view = handle.view().await?;
                handle.shutdown().await?;
                if let Err(e) = task.await {
                    warn!(error = %e, "checkout actor did not stop cleanly");
                }
                Some(view)
            }
            None => None,
        };
        Ok(CheckoutReport {
            receipt: checkout.as_ref().and_then(|view| view.receipt.clone()),
            checkout,
            cart: self.cart.cart().await?,
            history: self.history.history().await?,
        })
    }
}
