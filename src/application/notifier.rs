use crate::domain::order::CheckoutSummary;
use crate::domain::ports::NotificationSinkRef;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Fire-and-forget delivery of checkout summaries.
///
/// Delivery runs on a detached task; a failure is logged and goes nowhere
/// else.
#[derive(Clone)]
pub struct Notifier {
    sink: Option<NotificationSinkRef>,
}

impl Notifier {
    pub fn new(sink: NotificationSinkRef) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Spawns delivery of `summary`. The handle is only useful to tests.
    pub fn dispatch(&self, summary: CheckoutSummary) -> Option<JoinHandle<()>> {
        let sink = self.sink.clone()?;
        Some(tokio::spawn(async move {
            let order_id = summary.order.order_id;
            match sink.deliver(&summary).await {
                Ok(()) => debug!(%order_id, "checkout summary delivered"),
                Err(e) => warn!(%order_id, error = %e, "checkout summary delivery failed"),
            }
        }))
    }
}
