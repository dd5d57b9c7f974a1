use super::orchestrator::{CheckoutOrchestrator, CheckoutView};
use crate::domain::order::OrderReceipt;
use crate::domain::otp::{ChallengeId, Outcome};
use crate::domain::payment::CardSubmission;
use crate::domain::session::{CheckoutStep, ShippingRecord};
use crate::error::{CheckoutError, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::debug;

type Reply<T> = oneshot::Sender<Result<T>>;

enum Command {
    SubmitShipping(ShippingRecord, Reply<CheckoutStep>),
    SubmitPayment(CardSubmission, Reply<CheckoutStep>),
    SubmitCode(String, Reply<Outcome>),
    PasteCode(String, Reply<Outcome>),
    Resend(Reply<Outcome>),
    Tick(Reply<Outcome>),
    BackToPayment(Reply<CheckoutStep>),
    EditShipping(Reply<CheckoutStep>),
    Confirm(Reply<OrderReceipt>),
    View(oneshot::Sender<CheckoutView>),
    Shutdown(oneshot::Sender<()>),
}

/// Owns one orchestrator and applies commands to it strictly in arrival
/// order, interleaved with countdown ticks.
///
/// A command queued while another is awaiting a collaborator (a verify, an
/// order submission) runs only after that one completes.
pub struct CheckoutActor {
    orchestrator: CheckoutOrchestrator,
    commands: mpsc::Receiver<Command>,
    ticks: mpsc::UnboundedReceiver<ChallengeId>,
}

impl CheckoutActor {
    /// Spawns the actor. `ticks` is the receiving end of the scheduler the
    /// orchestrator was built with.
    pub fn spawn(
        orchestrator: CheckoutOrchestrator,
        ticks: mpsc::UnboundedReceiver<ChallengeId>,
    ) -> (CheckoutHandle, JoinHandle<()>) {
        let (tx, commands) = mpsc::channel(32);
        let actor = Self {
            orchestrator,
            commands,
            ticks,
        };
        let task = tokio::spawn(actor.run());
        (CheckoutHandle { commands: tx }, task)
    }

    async fn run(mut self) {
        let mut shutdown = None;
        loop {
            tokio::select! {
                biased;
                command = self.commands.recv() => match command {
                    Some(command) => {
                        if let Some(done) = self.handle(command).await {
                            shutdown = Some(done);
                            break;
                        }
                    }
                    None => break,
                },
                Some(challenge) = self.ticks.recv() => {
                    self.orchestrator.on_tick(challenge);
                }
            }
        }

        debug!(session_id = %self.orchestrator.session().id, "checkout actor stopping");
        self.orchestrator.abandon().await;
        if let Some(done) = shutdown {
            let _ = done.send(());
        }
    }

    /// Applies one command. Returns the completion signal when the command
    /// asks the actor to stop.
    async fn handle(&mut self, command: Command) -> Option<oneshot::Sender<()>> {
        let o = &mut self.orchestrator;
        // A dropped reply receiver only means the caller stopped waiting.
        match command {
            Command::SubmitShipping(record, reply) => {
                let _ = reply.send(o.submit_shipping(record));
            }
            Command::SubmitPayment(card, reply) => {
                let _ = reply.send(o.submit_payment(card).await);
            }
            Command::SubmitCode(code, reply) => {
                let _ = reply.send(o.submit_code(&code).await);
            }
            Command::PasteCode(raw, reply) => {
                let _ = reply.send(o.paste_code(&raw).await);
            }
            Command::Resend(reply) => {
                let _ = reply.send(o.resend_code().await);
            }
            Command::Tick(reply) => {
                let _ = reply.send(Ok(o.tick()));
            }
            Command::BackToPayment(reply) => {
                let _ = reply.send(o.back_to_payment());
            }
            Command::EditShipping(reply) => {
                let _ = reply.send(o.edit_shipping());
            }
            Command::Confirm(reply) => {
                let _ = reply.send(o.confirm().await);
            }
            Command::View(reply) => {
                let _ = reply.send(o.view());
            }
            Command::Shutdown(done) => return Some(done),
        }
        None
    }
}

/// Cloneable front door to a running [`CheckoutActor`].
#[derive(Clone)]
pub struct CheckoutHandle {
    commands: mpsc::Sender<Command>,
}

impl CheckoutHandle {
    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .await
            .map_err(|_| CheckoutError::SessionClosed)?;
        rx.await.map_err(|_| CheckoutError::SessionClosed)?
    }

    pub async fn submit_shipping(&self, record: ShippingRecord) -> Result<CheckoutStep> {
        self.request(|reply| Command::SubmitShipping(record, reply))
            .await
    }

    pub async fn submit_payment(&self, card: CardSubmission) -> Result<CheckoutStep> {
        self.request(|reply| Command::SubmitPayment(card, reply))
            .await
    }

    pub async fn submit_code(&self, code: impl Into<String>) -> Result<Outcome> {
        let code = code.into();
        self.request(|reply| Command::SubmitCode(code, reply)).await
    }

    pub async fn paste_code(&self, raw: impl Into<String>) -> Result<Outcome> {
        let raw = raw.into();
        self.request(|reply| Command::PasteCode(raw, reply)).await
    }

    pub async fn resend_code(&self) -> Result<Outcome> {
        self.request(Command::Resend).await
    }

    /// Ticks the current challenge right away instead of waiting for the
    /// scheduler.
    pub async fn tick(&self) -> Result<Outcome> {
        self.request(Command::Tick).await
    }

    pub async fn back_to_payment(&self) -> Result<CheckoutStep> {
        self.request(Command::BackToPayment).await
    }

    pub async fn edit_shipping(&self) -> Result<CheckoutStep> {
        self.request(Command::EditShipping).await
    }

    pub async fn confirm(&self) -> Result<OrderReceipt> {
        self.request(Command::Confirm).await
    }

    pub async fn view(&self) -> Result<CheckoutView> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::View(tx))
            .await
            .map_err(|_| CheckoutError::SessionClosed)?;
        rx.await.map_err(|_| CheckoutError::SessionClosed)
    }

    /// Destroys the session and waits until the actor has stopped.
    pub async fn shutdown(&self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Shutdown(tx))
            .await
            .map_err(|_| CheckoutError::SessionClosed)?;
        rx.await.map_err(|_| CheckoutError::SessionClosed)
    }
}
