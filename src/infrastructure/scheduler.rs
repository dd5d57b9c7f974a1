use crate::domain::otp::ChallengeId;
use crate::domain::ports::{Scheduler, Subscription};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Emits the subscribed challenge id on a tokio interval.
///
/// Ticks arrive on the receiver returned by [`TokioScheduler::new`]; the
/// interval task is aborted when its [`Subscription`] is dropped.
#[derive(Clone)]
pub struct TokioScheduler {
    ticks: mpsc::UnboundedSender<ChallengeId>,
}

impl TokioScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChallengeId>) {
        let (ticks, rx) = mpsc::unbounded_channel();
        (Self { ticks }, rx)
    }
}

impl Scheduler for TokioScheduler {
    fn subscribe(&self, challenge: ChallengeId, period: Duration) -> Subscription {
        let ticks = self.ticks.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if ticks.send(challenge).is_err() {
                    break;
                }
            }
        });
        Subscription::new(move || handle.abort())
    }
}

/// Records subscriptions without ticking; tests tick the orchestrator by hand.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    active: Arc<Mutex<HashSet<ChallengeId>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Vec<ChallengeId> {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    pub fn is_active(&self, challenge: ChallengeId) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&challenge)
    }
}

impl Scheduler for ManualScheduler {
    fn subscribe(&self, challenge: ChallengeId, _period: Duration) -> Subscription {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(challenge);
        let active = self.active.clone();
        Subscription::new(move || {
            active
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&challenge);
        })
    }
}
