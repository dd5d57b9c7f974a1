use crate::domain::order::CheckoutSummary;
use crate::domain::ports::NotificationSink;
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Writes the checkout summary to the log instead of a third party.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn deliver(&self, summary: &CheckoutSummary) -> Result<()> {
        let payload = serde_json::to_string(summary)?;
        info!(order_id = %summary.order.order_id, %payload, "checkout summary");
        Ok(())
    }
}
