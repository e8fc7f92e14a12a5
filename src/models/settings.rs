use serde::{Deserialize, Serialize};

use crate::otp::OtpConfig;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// OTP policy constants
    #[serde(default)]
    pub otp: OtpConfig,
    /// Which store backend holds codes and confirmation entries
    #[serde(default)]
    pub store: StoreConfig,
    /// Notification dispatch settings
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl AppConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(4..=10).contains(&self.otp.code_length) {
            return Err(format!(
                "otp.code_length must be between 4 and 10, got {}",
                self.otp.code_length
            ));
        }

        if self.otp.validity_secs <= 0 {
            return Err("otp.validity_secs must be positive".to_string());
        }

        if self.otp.confirm_window_secs <= 0 {
            return Err("otp.confirm_window_secs must be positive".to_string());
        }

        if self.otp.confirm_window_secs > self.otp.validity_secs {
            return Err(
                "otp.confirm_window_secs must not exceed otp.validity_secs".to_string(),
            );
        }

        if self.otp.max_tries == 0 {
            return Err("otp.max_tries must be at least 1".to_string());
        }

        if self.dispatch.queue_capacity == 0 {
            return Err("dispatch.queue_capacity must be at least 1".to_string());
        }

        Ok(())
    }
}

/// Store backend selection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// In-process store; state is lost on restart
    #[default]
    Memory,
    /// Shared Redis instance
    Redis { url: String },
}

/// Notification dispatch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Bounded queue size; enqueues beyond it are dropped
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Name notifications are sent under
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
}

fn default_queue_capacity() -> usize {
    64
}

fn default_sender_name() -> String {
    "Recruitment Team".to_string()
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            sender_name: default_sender_name(),
        }
    }
}
