// OTP types and policy configuration

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Purpose of an issued one-time code
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OtpAction {
    /// Password reset for an existing account
    PasswordReset,
    /// Activation of a newly registered account
    AccountActivation,
    /// Acceptance of an issued offer letter
    OfferAcceptance,
}

impl OtpAction {
    /// Short name used in store keys and log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpAction::PasswordReset => "password_reset",
            OtpAction::AccountActivation => "account_activation",
            OtpAction::OfferAcceptance => "offer_acceptance",
        }
    }
}

impl std::fmt::Display for OtpAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OTP policy constants
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpConfig {
    /// Number of digits in a generated code
    #[serde(default = "default_code_length")]
    pub code_length: u32,
    /// How long an issued code stays valid, in seconds
    #[serde(default = "default_validity_secs")]
    pub validity_secs: i64,
    /// Secondary window after a successful verification, in seconds
    #[serde(default = "default_confirm_window_secs")]
    pub confirm_window_secs: i64,
    /// Failed verification attempts allowed before the code is invalidated
    #[serde(default = "default_max_tries")]
    pub max_tries: u32,
}

fn default_code_length() -> u32 {
    6
}

fn default_validity_secs() -> i64 {
    600 // 10 minutes
}

fn default_confirm_window_secs() -> i64 {
    180
}

fn default_max_tries() -> u32 {
    3
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_length: default_code_length(),
            validity_secs: default_validity_secs(),
            confirm_window_secs: default_confirm_window_secs(),
            max_tries: default_max_tries(),
        }
    }
}

impl OtpConfig {
    pub fn validity_window(&self) -> Duration {
        Duration::seconds(self.validity_secs)
    }

    pub fn confirm_window(&self) -> Duration {
        Duration::seconds(self.confirm_window_secs)
    }

    /// How long a record is kept in the store. Longer than the validity
    /// window, so a lapsed code reports `Expired` rather than vanishing
    /// into `NotFound`; cleanup prunes it afterwards.
    pub fn retention_window(&self) -> Duration {
        self.validity_window() + self.confirm_window()
    }
}

/// An issued one-time code, keyed in the store by (user id, action)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpRecord {
    /// Fixed-length numeric code
    pub code: String,
    /// When the code was generated
    pub created_at: DateTime<Utc>,
    /// Failed verification attempts so far
    pub tries: u32,
    /// Purpose the code was issued for
    pub action: OtpAction,
}

impl OtpRecord {
    /// Issue a fresh record with a random fixed-length numeric code
    pub fn issue(action: OtpAction, config: &OtpConfig) -> Self {
        Self {
            code: generate_code(config.code_length),
            created_at: Utc::now(),
            tries: 0,
            action,
        }
    }

    /// Whether the code is past its validity window
    pub fn is_expired(&self, config: &OtpConfig) -> bool {
        Utc::now() - self.created_at > config.validity_window()
    }

    /// Whether the attempt limit has been reached
    pub fn is_exhausted(&self, config: &OtpConfig) -> bool {
        self.tries >= config.max_tries
    }
}

/// Generate a random numeric code of the given length, zero-padded
fn generate_code(length: u32) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Verification errors, reported synchronously to the caller
#[derive(Debug)]
pub enum OtpError {
    /// No active code exists for the (user, action) pair
    NotFound,
    /// The code is past its validity window
    Expired,
    /// The attempt limit has been reached
    AttemptsExceeded,
    /// The submitted code does not match
    Mismatch,
    /// The backing store failed
    Store(StoreError),
}

impl std::fmt::Display for OtpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OtpError::NotFound => write!(f, "No active code for this action"),
            OtpError::Expired => write!(f, "Code has expired"),
            OtpError::AttemptsExceeded => write!(f, "Too many failed attempts"),
            OtpError::Mismatch => write!(f, "Incorrect code"),
            OtpError::Store(e) => write!(f, "Store error: {}", e),
        }
    }
}

impl std::error::Error for OtpError {}

impl From<StoreError> for OtpError {
    fn from(e: StoreError) -> Self {
        OtpError::Store(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_code_is_numeric_and_fixed_length() {
        let config = OtpConfig::default();
        let record = OtpRecord::issue(OtpAction::PasswordReset, &config);

        assert_eq!(record.code.len(), 6);
        assert!(record.code.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(record.tries, 0);
    }

    #[test]
    fn test_code_length_is_configurable() {
        let config = OtpConfig {
            code_length: 8,
            ..OtpConfig::default()
        };
        let record = OtpRecord::issue(OtpAction::AccountActivation, &config);

        assert_eq!(record.code.len(), 8);
    }

    #[test]
    fn test_expiry_uses_validity_window() {
        let config = OtpConfig::default();
        let mut record = OtpRecord::issue(OtpAction::PasswordReset, &config);
        assert!(!record.is_expired(&config));

        // Backdate past the 10 minute window
        record.created_at = Utc::now() - Duration::minutes(11);
        assert!(record.is_expired(&config));
    }

    #[test]
    fn test_exhaustion_uses_max_tries() {
        let config = OtpConfig::default();
        let mut record = OtpRecord::issue(OtpAction::PasswordReset, &config);
        assert!(!record.is_exhausted(&config));

        record.tries = 3;
        assert!(record.is_exhausted(&config));
    }
}
