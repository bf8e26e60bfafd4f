//! Notifier that writes payloads to the tracing log.

use crate::traits::{Notification, Notifier, NotifyError};

/// Emits each notification as an `info` event. Used for dry runs and when no
/// delivery channel is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(
            subject = %notification.subject,
            body = %notification.body,
            "notification"
        );
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "log"
    }
}
