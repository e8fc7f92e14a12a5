// OTP verification and password-reset core for a recruitment backend.
// HTTP surface, user persistence, and mail transport live elsewhere and
// plug in through the UserDirectory and Notifier traits.

pub mod config;
pub mod directory;
pub mod models;
pub mod notify;
pub mod otp;
pub mod reset;
pub mod store;
