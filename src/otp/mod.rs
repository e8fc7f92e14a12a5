// OTP verification service
// Issues short-lived one-time codes and enforces expiry and retry-limit policy

pub mod service;
pub mod types;

pub use service::OtpService;
pub use types::{OtpAction, OtpConfig, OtpError, OtpRecord};
