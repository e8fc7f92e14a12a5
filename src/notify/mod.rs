// Notification delivery seam
// The transport (SMTP, SMS, ...) is an external collaborator behind the Notifier trait

pub mod dispatcher;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::otp::OtpAction;

pub use dispatcher::NotificationDispatcher;

/// Payload handed to the delivery channel when a code is issued
#[derive(Debug, Clone)]
pub struct OtpNotification {
    /// Where to deliver the code (email address or phone number)
    pub recipient: String,
    /// Name used to address the recipient
    pub display_name: String,
    /// The issued code
    pub code: String,
    /// What the code was issued for
    pub action: OtpAction,
}

/// Delivery errors; logged by the dispatcher, never surfaced to the caller
#[derive(Debug)]
pub enum NotifyError {
    DeliveryFailed(String),
}

impl std::fmt::Display for NotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotifyError::DeliveryFailed(msg) => write!(f, "Delivery failed: {}", msg),
        }
    }
}

impl std::error::Error for NotifyError {}

/// Trait for notification transports
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, notification: &OtpNotification) -> Result<(), NotifyError>;
}

/// Notifier that writes deliveries to the structured log.
/// Stands in for the real transport in development.
pub struct LogNotifier {
    sender_name: String,
}

impl LogNotifier {
    pub fn new(sender_name: &str) -> Self {
        Self {
            sender_name: sender_name.to_string(),
        }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn deliver(&self, notification: &OtpNotification) -> Result<(), NotifyError> {
        info!(
            "[{}] To {} ({}): your {} verification code is {}",
            self.sender_name,
            notification.display_name,
            notification.recipient,
            notification.action,
            notification.code
        );
        Ok(())
    }
}

/// Notifier that captures deliveries in memory, for tests
pub struct MemoryNotifier {
    delivered: Arc<Mutex<Vec<OtpNotification>>>,
    fail: bool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self {
            delivered: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }

    /// A notifier whose every delivery fails
    pub fn failing() -> Self {
        Self {
            delivered: Arc::new(Mutex::new(Vec::new())),
            fail: true,
        }
    }

    pub async fn delivered(&self) -> Vec<OtpNotification> {
        self.delivered.lock().await.clone()
    }
}

impl Default for MemoryNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn deliver(&self, notification: &OtpNotification) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::DeliveryFailed("transport unavailable".to_string()));
        }

        self.delivered.lock().await.push(notification.clone());
        Ok(())
    }
}
