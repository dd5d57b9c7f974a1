//! Read-only parameters supplied when a checkout session starts.

use crate::domain::otp::{DeliveryChannel, OtpPolicy};
use crate::error::{CheckoutError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// One-time-code challenge settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OtpConfig {
    /// Feature switch for the verification step.
    pub enabled: bool,
    /// Number of digits in a code.
    pub code_length: usize,
    /// Seconds from issue (or resend) until the code expires.
    pub expiry_seconds: u64,
    /// Rejected submissions allowed before the challenge is blocked.
    pub max_attempts: u32,
    /// Where the code is sent.
    pub channel: DeliveryChannel,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            code_length: 6,
            expiry_seconds: 60,
            max_attempts: 3,
            channel: DeliveryChannel::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    /// Include the full card number in the delivered summary instead of the
    /// masked form.
    pub reveal_card_number: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            reveal_card_number: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorefrontConfig {
    /// Maximum number of browsing-history entries kept.
    pub history_limit: usize,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self { history_limit: 20 }
    }
}

/// Top-level checkout configuration.
///
/// Loaded once and shared behind an `Arc`; nothing in the checkout core
/// mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    pub otp: OtpConfig,
    /// Site-level switch; the code step runs only when this and
    /// `otp.enabled` are both set.
    pub require_card_verification: bool,
    pub currency: String,
    /// Countdown tick period in milliseconds.
    pub tick_interval_ms: u64,
    pub notification: NotificationConfig,
    pub storefront: StorefrontConfig,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            otp: OtpConfig::default(),
            require_card_verification: true,
            currency: "USD".to_string(),
            tick_interval_ms: 1000,
            notification: NotificationConfig::default(),
            storefront: StorefrontConfig::default(),
        }
    }
}

impl CheckoutConfig {
    /// Load and validate configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or fails
    /// validation.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| CheckoutError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns [`CheckoutError::Config`] naming the first out-of-range field.
    pub fn validate(&self) -> Result<()> {
        if !(1..=12).contains(&self.otp.code_length) {
            return Err(CheckoutError::Config(format!(
                "otp.code_length must be between 1 and 12, got {}",
                self.otp.code_length
            )));
        }
        if self.otp.max_attempts == 0 {
            return Err(CheckoutError::Config(
                "otp.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.otp.expiry_seconds == 0 {
            return Err(CheckoutError::Config(
                "otp.expiry_seconds must be at least 1".to_string(),
            ));
        }
        if self.currency.trim().is_empty() {
            return Err(CheckoutError::Config("currency must be set".to_string()));
        }
        if self.tick_interval_ms == 0 {
            return Err(CheckoutError::Config(
                "tick_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.storefront.history_limit == 0 {
            return Err(CheckoutError::Config(
                "storefront.history_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether checkout must pass through the one-time-code step.
    pub fn otp_required(&self) -> bool {
        self.otp.enabled && self.require_card_verification
    }

    pub fn otp_policy(&self) -> OtpPolicy {
        OtpPolicy {
            code_length: self.otp.code_length,
            expiry_seconds: self.otp.expiry_seconds,
            max_attempts: self.otp.max_attempts,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CheckoutConfig::default();
        assert_eq!(config.otp.code_length, 6);
        assert_eq!(config.otp.expiry_seconds, 60);
        assert_eq!(config.otp.max_attempts, 3);
        assert_eq!(config.storefront.history_limit, 20);
        assert!(config.otp_required());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config = CheckoutConfig::from_toml(
            r#"
            currency = "EUR"

            [otp]
            code_length = 4
            channel = "email"
            "#,
        )
        .unwrap();

        assert_eq!(config.currency, "EUR");
        assert_eq!(config.otp.code_length, 4);
        assert_eq!(config.otp.channel, DeliveryChannel::Email);
        assert_eq!(config.otp.max_attempts, 3);
        assert!(config.notification.enabled);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = CheckoutConfig::from_toml("[otp]\nmax_attempts = 0");
        assert!(matches!(result, Err(CheckoutError::Config(_))));

        let result = CheckoutConfig::from_toml("[otp]\ncode_length = 13");
        assert!(matches!(result, Err(CheckoutError::Config(_))));

        let result = CheckoutConfig::from_toml("currency = \"  \"");
        assert!(matches!(result, Err(CheckoutError::Config(_))));
    }

    #[test]
    fn test_otp_required_needs_both_switches() {
        let mut config = CheckoutConfig::default();
        config.require_card_verification = false;
        assert!(!config.otp_required());

        let mut config = CheckoutConfig::default();
        config.otp.enabled = false;
        assert!(!config.otp_required());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkout.toml");
        std::fs::write(&path, "tick_interval_ms = 250\n").unwrap();

        let config = CheckoutConfig::from_file(&path).unwrap();
        assert_eq!(config.tick_interval(), Duration::from_millis(250));
    }
}
