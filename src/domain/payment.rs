use crate::error::{CheckoutError, Result};
use serde::{Deserialize, Serialize};

const MIN_CARD_DIGITS: usize = 16;

/// Card network guessed from the number prefix. Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardBrand {
    #[serde(rename = "Visa")]
    Visa,
    #[serde(rename = "Mastercard")]
    Mastercard,
    #[serde(rename = "American Express")]
    AmericanExpress,
    #[serde(rename = "Discover")]
    Discover,
    #[serde(rename = "Card")]
    Generic,
}

impl CardBrand {
    /// Detects the brand from a digits-only card number.
    pub fn detect(digits: &str) -> Self {
        let prefix2 = digits.get(..2).and_then(|p| p.parse::<u8>().ok());
        if digits.starts_with('4') {
            CardBrand::Visa
        } else if matches!(prefix2, Some(51..=55)) {
            CardBrand::Mastercard
        } else if matches!(prefix2, Some(34 | 37)) {
            CardBrand::AmericanExpress
        } else if digits.starts_with("6011") || digits.starts_with("65") {
            CardBrand::Discover
        } else {
            CardBrand::Generic
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            CardBrand::Visa => "Visa",
            CardBrand::Mastercard => "Mastercard",
            CardBrand::AmericanExpress => "American Express",
            CardBrand::Discover => "Discover",
            CardBrand::Generic => "Card",
        }
    }
}

impl std::fmt::Display for CardBrand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A card-like instrument as the buyer typed it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CardSubmission {
    pub holder_name: String,
    pub number: String,
    pub expiry_month: u8,
    pub expiry_year: u16,
}

/// Normalized, immutable description of a captured payment instrument.
///
/// A new capture replaces a stored descriptor wholesale; there are no
/// setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDescriptor {
    holder_name: String,
    number: String,
    brand: CardBrand,
    expiry_month: u8,
    expiry_year: u16,
    last_four: String,
}

impl PaymentDescriptor {
    /// Normalizes a submission into a descriptor.
    ///
    /// The number is kept exactly as submitted; brand and last four are
    /// derived from its digits.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::Validation`] for a blank holder name, fewer
    /// than 16 digits in the number, or an expiry month outside `1..=12`.
    pub fn capture(submission: CardSubmission) -> Result<Self> {
        let holder_name = submission.holder_name.trim().to_string();
        if holder_name.is_empty() {
            return Err(CheckoutError::Validation(
                "Card holder name is required".to_string(),
            ));
        }

        let digits: String = submission
            .number
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        if digits.len() < MIN_CARD_DIGITS {
            return Err(CheckoutError::Validation(format!(
                "Card number must have at least {} digits, got {}",
                MIN_CARD_DIGITS,
                digits.len()
            )));
        }

        if !(1..=12).contains(&submission.expiry_month) {
            return Err(CheckoutError::Validation(format!(
                "Invalid expiry month {}",
                submission.expiry_month
            )));
        }

        let last_four = digits[digits.len() - 4..].to_string();

        Ok(Self {
            holder_name,
            brand: CardBrand::detect(&digits),
            number: submission.number,
            expiry_month: submission.expiry_month,
            expiry_year: submission.expiry_year,
            last_four,
        })
    }

    pub fn holder_name(&self) -> &str {
        &self.holder_name
    }

    /// The number exactly as captured.
    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn brand(&self) -> CardBrand {
        self.brand
    }

    pub fn expiry_month(&self) -> u8 {
        self.expiry_month
    }

    pub fn expiry_year(&self) -> u16 {
        self.expiry_year
    }

    pub fn last_four(&self) -> &str {
        &self.last_four
    }

    pub fn masked_number(&self) -> String {
        format!("**** **** **** {}", self.last_four)
    }
}
