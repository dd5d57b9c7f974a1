//! One-time-code challenge.
//!
//! The challenge is a single tagged state transitioned by the pure
//! [`reduce`] function. Time never advances on its own here: every event
//! carries the `now` observed by the caller's clock, and expiry is decided
//! against an absolute deadline rather than a decrementing counter.

use crate::error::{CheckoutError, Result};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one issued code. A resend issues a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChallengeId(pub Uuid);

impl ChallengeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChallengeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChallengeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryChannel {
    #[default]
    Sms,
    Email,
    Voice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpPolicy {
    pub code_length: usize,
    pub expiry_seconds: u64,
    pub max_attempts: u32,
}

impl Default for OtpPolicy {
    fn default() -> Self {
        Self {
            code_length: 6,
            expiry_seconds: 60,
            max_attempts: 3,
        }
    }
}

impl OtpPolicy {
    pub fn expiry(&self) -> TimeDelta {
        // Clamped so the deadline arithmetic cannot overflow.
        TimeDelta::seconds(self.expiry_seconds.min(u64::from(u32::MAX)) as i64)
    }

    /// `^\d{L}$` over ASCII digits.
    pub fn is_well_formed(&self, candidate: &str) -> bool {
        candidate.len() == self.code_length && candidate.bytes().all(|b| b.is_ascii_digit())
    }
}

/// Answer of a [`Verifier`](super::ports::Verifier) for one candidate code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ChallengeState {
    /// Counting down, awaiting input.
    Pending {
        deadline: DateTime<Utc>,
        attempts: u32,
    },
    /// A well-formed candidate is with the verifier.
    Verifying {
        deadline: DateTime<Utc>,
        attempts: u32,
    },
    Verified { at: DateTime<Utc>, attempts: u32 },
    /// Terminal until a resend.
    Expired { attempts: u32 },
    /// Terminal. No resend, no further submissions.
    Blocked { attempts: u32 },
}

impl ChallengeState {
    pub fn attempts(&self) -> u32 {
        match *self {
            ChallengeState::Pending { attempts, .. }
            | ChallengeState::Verifying { attempts, .. }
            | ChallengeState::Verified { attempts, .. }
            | ChallengeState::Expired { attempts }
            | ChallengeState::Blocked { attempts } => attempts,
        }
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        match *self {
            ChallengeState::Pending { deadline, .. } | ChallengeState::Verifying { deadline, .. } => {
                Some(deadline)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ChallengeEvent<'a> {
    Tick { now: DateTime<Utc> },
    Submit { candidate: &'a str, now: DateTime<Utc> },
    Verdict { verdict: Verdict, now: DateTime<Utc> },
    Resend { now: DateTime<Utc> },
}

/// What an accepted event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Unchanged,
    Expired,
    AwaitingVerdict,
    Verified,
    Rejected { remaining: u32 },
    Blocked,
    Reissued { deadline: DateTime<Utc> },
}

#[derive(Debug)]
pub struct Transition {
    pub state: ChallengeState,
    pub result: Result<Outcome>,
}

impl Transition {
    fn ok(state: ChallengeState, outcome: Outcome) -> Self {
        Self {
            state,
            result: Ok(outcome),
        }
    }

    fn err(state: ChallengeState, error: CheckoutError) -> Self {
        Self {
            state,
            result: Err(error),
        }
    }
}

fn fresh(policy: &OtpPolicy, now: DateTime<Utc>) -> ChallengeState {
    ChallengeState::Pending {
        deadline: now + policy.expiry(),
        attempts: 0,
    }
}

/// Applies one event to a challenge state.
pub fn reduce(policy: &OtpPolicy, state: ChallengeState, event: ChallengeEvent<'_>) -> Transition {
    use ChallengeState as S;

    match event {
        ChallengeEvent::Tick { now } => match state {
            S::Pending { deadline, attempts } if now >= deadline => {
                Transition::ok(S::Expired { attempts }, Outcome::Expired)
            }
            _ => Transition::ok(state, Outcome::Unchanged),
        },

        ChallengeEvent::Submit { candidate, now } => {
            if !policy.is_well_formed(candidate) {
                return Transition::err(
                    state,
                    CheckoutError::Validation(format!(
                        "Code must be exactly {} digits",
                        policy.code_length
                    )),
                );
            }
            match state {
                S::Blocked { .. } => Transition::err(state, CheckoutError::Blocked),
                S::Expired { .. } => Transition::err(state, CheckoutError::ExpiredChallenge),
                S::Pending { deadline, attempts } if now >= deadline => {
                    Transition::err(S::Expired { attempts }, CheckoutError::ExpiredChallenge)
                }
                S::Pending { deadline, attempts } => Transition::ok(
                    S::Verifying { deadline, attempts },
                    Outcome::AwaitingVerdict,
                ),
                S::Verifying { .. } => Transition::err(state, CheckoutError::VerificationInFlight),
                S::Verified { .. } => Transition::ok(state, Outcome::Verified),
            }
        }

        ChallengeEvent::Verdict { verdict, now } => match (state, verdict) {
            (S::Verifying { attempts, .. }, Verdict::Accepted) => {
                Transition::ok(S::Verified { at: now, attempts }, Outcome::Verified)
            }
            (S::Verifying { deadline, attempts }, Verdict::Rejected) => {
                let attempts = attempts + 1;
                if attempts >= policy.max_attempts {
                    Transition::ok(S::Blocked { attempts }, Outcome::Blocked)
                } else {
                    Transition::ok(
                        S::Pending { deadline, attempts },
                        Outcome::Rejected {
                            remaining: policy.max_attempts - attempts,
                        },
                    )
                }
            }
            // A verdict for a submission that is no longer in flight.
            _ => Transition::ok(state, Outcome::Unchanged),
        },

        ChallengeEvent::Resend { now } => match state {
            S::Blocked { .. } => Transition::err(state, CheckoutError::Blocked),
            S::Verifying { .. } => Transition::err(state, CheckoutError::VerificationInFlight),
            S::Verified { .. } => Transition::ok(state, Outcome::Unchanged),
            S::Pending { .. } | S::Expired { .. } => {
                let state = fresh(policy, now);
                let deadline = now + policy.expiry();
                Transition::ok(state, Outcome::Reissued { deadline })
            }
        },
    }
}

/// One live challenge bound to a payment-capture attempt.
#[derive(Debug, Clone)]
pub struct OtpChallenge {
    id: ChallengeId,
    policy: OtpPolicy,
    channel: DeliveryChannel,
    state: ChallengeState,
}

impl OtpChallenge {
    pub fn start(policy: OtpPolicy, channel: DeliveryChannel, now: DateTime<Utc>) -> Self {
        Self {
            id: ChallengeId::new(),
            state: fresh(&policy, now),
            policy,
            channel,
        }
    }

    pub fn id(&self) -> ChallengeId {
        self.id
    }

    pub fn policy(&self) -> &OtpPolicy {
        &self.policy
    }

    pub fn channel(&self) -> DeliveryChannel {
        self.channel
    }

    pub fn state(&self) -> ChallengeState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.state.attempts()
    }

    pub fn remaining_attempts(&self) -> u32 {
        self.policy.max_attempts.saturating_sub(self.attempts())
    }

    pub fn is_verified(&self) -> bool {
        matches!(self.state, ChallengeState::Verified { .. })
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self.state, ChallengeState::Blocked { .. })
    }

    pub fn is_expired(&self) -> bool {
        matches!(self.state, ChallengeState::Expired { .. })
    }

    /// Whether the countdown still matters for this challenge.
    pub fn is_counting_down(&self) -> bool {
        matches!(
            self.state,
            ChallengeState::Pending { .. } | ChallengeState::Verifying { .. }
        )
    }

    /// Whole seconds until the deadline, never negative.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> u64 {
        self.state
            .deadline()
            .map(|deadline| u64::try_from((deadline - now).num_seconds()).unwrap_or(0))
            .unwrap_or(0)
    }

    fn apply(&mut self, event: ChallengeEvent<'_>) -> Result<Outcome> {
        let transition = reduce(&self.policy, self.state, event);
        self.state = transition.state;
        transition.result
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Outcome {
        // Ticks never fail.
        self.apply(ChallengeEvent::Tick { now })
            .unwrap_or(Outcome::Unchanged)
    }

    /// Hands a candidate to verification. On success the challenge is
    /// `Verifying` and the caller must follow up with [`Self::complete`].
    pub fn submit(&mut self, candidate: &str, now: DateTime<Utc>) -> Result<Outcome> {
        self.apply(ChallengeEvent::Submit { candidate, now })
    }

    pub fn complete(&mut self, verdict: Verdict, now: DateTime<Utc>) -> Result<Outcome> {
        self.apply(ChallengeEvent::Verdict { verdict, now })
    }

    /// Issues a fresh code: new id, new deadline, attempts back to zero.
    pub fn resend(&mut self, now: DateTime<Utc>) -> Result<Outcome> {
        let outcome = self.apply(ChallengeEvent::Resend { now })?;
        if matches!(outcome, Outcome::Reissued { .. }) {
            self.id = ChallengeId::new();
        }
        Ok(outcome)
    }
}

/// Normalizes pasted text into code-input digits: non-digits are dropped
/// and anything beyond `code_length` is cut off. A shorter result leaves
/// the remaining input slots empty.
pub fn normalize_pasted_code(raw: &str, code_length: usize) -> String {
    raw.chars()
        .filter(char::is_ascii_digit)
        .take(code_length)
        .collect()
}

/// Formats remaining seconds as `m:ss`.
pub fn format_countdown(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
