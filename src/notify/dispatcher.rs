// Best-effort notification dispatch
// A bounded queue and one worker task decouple delivery from the request path.
// Contract: enqueue never blocks and never fails the caller; delivery errors
// are logged, not retried.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::models::DispatchConfig;

use super::{LogNotifier, Notifier, OtpNotification};

struct Envelope {
    notification: OtpNotification,
    delay: Option<Duration>,
}

/// Handle to the dispatch queue; cheap to clone
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<Envelope>,
}

impl NotificationDispatcher {
    /// Spawn the worker task and return the queue handle
    pub fn start(notifier: Arc<dyn Notifier>, queue_capacity: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<Envelope>(queue_capacity);

        tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                match envelope.delay {
                    Some(delay) => {
                        // Delayed deliveries must not hold up the queue
                        let notifier = Arc::clone(&notifier);
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            deliver(notifier.as_ref(), &envelope.notification).await;
                        });
                    }
                    None => deliver(notifier.as_ref(), &envelope.notification).await,
                }
            }

            debug!("Notification worker stopped");
        });

        Self { tx }
    }

    /// Build a dispatcher from configuration, delivering through the log
    /// transport until a real one is wired in.
    pub fn from_config(config: &DispatchConfig) -> Self {
        let notifier = Arc::new(LogNotifier::new(&config.sender_name));
        Self::start(notifier, config.queue_capacity)
    }

    /// Queue a notification for immediate delivery
    pub fn enqueue(&self, notification: OtpNotification) {
        self.send(Envelope {
            notification,
            delay: None,
        });
    }

    /// Queue a notification to be delivered after the given delay
    pub fn enqueue_delayed(&self, notification: OtpNotification, delay: Duration) {
        self.send(Envelope {
            notification,
            delay: Some(delay),
        });
    }

    fn send(&self, envelope: Envelope) {
        if let Err(e) = self.tx.try_send(envelope) {
            let reason = match &e {
                mpsc::error::TrySendError::Full(_) => "queue full",
                mpsc::error::TrySendError::Closed(_) => "worker stopped",
            };
            let envelope = e.into_inner();
            warn!(
                "Dropping {} notification for {}: {}",
                envelope.notification.action, envelope.notification.recipient, reason
            );
        }
    }
}

async fn deliver(notifier: &dyn Notifier, notification: &OtpNotification) {
    if let Err(e) = notifier.deliver(notification).await {
        error!(
            "Failed to deliver {} notification to {}: {}",
            notification.action, notification.recipient, e
        );
    } else {
        debug!(
            "Delivered {} notification to {}",
            notification.action, notification.recipient
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MemoryNotifier;
    use crate::otp::OtpAction;

    fn test_notification(code: &str) -> OtpNotification {
        OtpNotification {
            recipient: "applicant@example.com".to_string(),
            display_name: "Jane Doe".to_string(),
            code: code.to_string(),
            action: OtpAction::PasswordReset,
        }
    }

    #[tokio::test]
    async fn test_enqueue_delivers_to_notifier() {
        let notifier = Arc::new(MemoryNotifier::new());
        let dispatcher = NotificationDispatcher::start(notifier.clone(), 16);

        dispatcher.enqueue(test_notification("123456"));

        tokio::time::sleep(Duration::from_millis(50)).await;

        let delivered = notifier.delivered().await;
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].code, "123456");
        assert_eq!(delivered[0].display_name, "Jane Doe");
    }

    #[tokio::test]
    async fn test_delayed_delivery_waits() {
        let notifier = Arc::new(MemoryNotifier::new());
        let dispatcher = NotificationDispatcher::start(notifier.clone(), 16);

        dispatcher.enqueue_delayed(test_notification("654321"), Duration::from_millis(80));

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(notifier.delivered().await.is_empty());

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(notifier.delivered().await.len(), 1);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_swallowed() {
        let notifier = Arc::new(MemoryNotifier::failing());
        let dispatcher = NotificationDispatcher::start(notifier.clone(), 16);

        // Nothing to assert beyond "does not panic or block"
        dispatcher.enqueue(test_notification("123456"));
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert!(notifier.delivered().await.is_empty());
    }
}
