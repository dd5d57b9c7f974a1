use crate::application::orchestrator::CheckoutView;
use crate::domain::cart::{BrowsingHistory, Cart};
use crate::domain::order::OrderReceipt;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

/// Final state of a script run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutReport {
    /// `None` when the script never started a checkout.
    pub checkout: Option<CheckoutView>,
    pub receipt: Option<OrderReceipt>,
    pub cart: Cart,
    pub history: BrowsingHistory,
}

/// Writes a [`CheckoutReport`] as pretty-printed JSON.
pub struct ReportWriter<W: Write> {
    writer: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// # Errors
    ///
    /// Returns [`CheckoutError::Serialization`](crate::error::CheckoutError::Serialization)
    /// or [`CheckoutError::Io`](crate::error::CheckoutError::Io) if
    /// the report cannot be written.
    pub fn write_report(&mut self, report: &CheckoutReport) -> Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, report)?;
        writeln!(self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report() {
        let report = CheckoutReport {
            checkout: None,
            receipt: None,
            cart: Cart::new(),
            history: BrowsingHistory::new(),
        };
        let mut out = Vec::new();
        ReportWriter::new(&mut out).write_report(&report).unwrap();

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert!(json["checkout"].is_null());
        assert_eq!(json["cart"], serde_json::json!([]));
        assert_eq!(json["history"], serde_json::json!([]));
        assert!(out.ends_with(b"\n"));
    }
}
