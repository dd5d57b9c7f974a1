use crate::domain::session::CheckoutStep;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckoutError>;

#[derive(Error, Debug)]
pub enum CheckoutError {
    /// Malformed shipping, payment or code input. The step does not advance
    /// and no verification attempt is consumed.
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Verification code expired, request a new code")]
    ExpiredChallenge,
    #[error("Verification blocked after too many attempts, please contact support")]
    Blocked,
    #[error("A verification is already in progress")]
    VerificationInFlight,
    #[error("Cannot {action} while at the {from} step")]
    InvalidTransition {
        from: CheckoutStep,
        action: &'static str,
    },
    #[error("Checkout session is closed")]
    SessionClosed,
    /// Order or transaction creation failed; the session stays at review.
    #[error("Order submission failed: {0}")]
    Submission(String),
    #[error("Notification delivery failed: {0}")]
    NotificationDelivery(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    Storage(#[from] rocksdb::Error),
}

impl CheckoutError {
    /// Whether the caller may retry the same action unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CheckoutError::Submission(_))
    }

    /// Whether the error ends the session's verification for good.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CheckoutError::Blocked)
    }
}
