use crate::domain::otp::{ChallengeId, Verdict};
use crate::domain::ports::Verifier;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Accepts every candidate that reaches it.
///
/// Candidates are shape-checked before verification, so this stands in for
/// an issued-code comparison: any correctly shaped code passes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShapeOnlyVerifier;

#[async_trait]
impl Verifier for ShapeOnlyVerifier {
    async fn verify(&self, _challenge: ChallengeId, _candidate: &str) -> Verdict {
        Verdict::Accepted
    }
}

/// Compares candidates against the code issued for the live challenge.
///
/// Codes come from a generator called on every issue. Only the latest
/// challenge keeps a code: issuing for a new challenge drops the one it
/// supersedes, so a challenge without a current code rejects everything.
#[derive(Clone)]
pub struct IssuedCodeVerifier {
    generate: Arc<dyn Fn(ChallengeId) -> String + Send + Sync>,
    current: Arc<RwLock<Option<(ChallengeId, String)>>>,
}

impl IssuedCodeVerifier {
    pub fn new(generate: impl Fn(ChallengeId) -> String + Send + Sync + 'static) -> Self {
        Self {
            generate: Arc::new(generate),
            current: Arc::default(),
        }
    }

    /// The code issued for `challenge`, if it is still the live one.
    pub async fn code_for(&self, challenge: ChallengeId) -> Option<String> {
        match &*self.current.read().await {
            Some((id, code)) if *id == challenge => Some(code.clone()),
            _ => None,
        }
    }
}

#[async_trait]
impl Verifier for IssuedCodeVerifier {
    async fn verify(&self, challenge: ChallengeId, candidate: &str) -> Verdict {
        match &*self.current.read().await {
            Some((id, code)) if *id == challenge && code == candidate => Verdict::Accepted,
            _ => Verdict::Rejected,
        }
    }

    async fn issued(&self, challenge: ChallengeId) {
        let code = (self.generate)(challenge);
        debug!(%challenge, "issued verification code");
        if let Some((superseded, _)) = self.current.write().await.replace((challenge, code)) {
            debug!(%superseded, "dropped superseded verification code");
        }
    }
}
