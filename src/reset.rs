// Password-reset flow: request -> verify -> confirm
//
// Each step maps to one request in the backend: "forgot password" issues a
// code, verification opens the short confirmation window, and the confirm
// step performs the actual password change inside that window.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::directory::{DirectoryError, UserDirectory};
use crate::otp::{OtpAction, OtpError, OtpService};

/// Reset flow errors
#[derive(Debug)]
pub enum ResetError {
    /// No account matches the given identifier
    UserNotFound,
    /// The current password did not match on a password change
    InvalidCurrentPassword,
    /// The new password was rejected
    InvalidPassword(String),
    /// Code verification failed
    Otp(OtpError),
    /// The directory backend failed
    Directory(String),
    /// Password hashing failed
    Hash(String),
}

impl std::fmt::Display for ResetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResetError::UserNotFound => write!(f, "User not found"),
            ResetError::InvalidCurrentPassword => write!(f, "Invalid current password"),
            ResetError::InvalidPassword(msg) => write!(f, "Invalid password: {}", msg),
            ResetError::Otp(e) => write!(f, "{}", e),
            ResetError::Directory(msg) => write!(f, "Directory error: {}", msg),
            ResetError::Hash(msg) => write!(f, "Hashing error: {}", msg),
        }
    }
}

impl std::error::Error for ResetError {}

impl From<OtpError> for ResetError {
    fn from(e: OtpError) -> Self {
        ResetError::Otp(e)
    }
}

impl From<DirectoryError> for ResetError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::UserNotFound => ResetError::UserNotFound,
            DirectoryError::Backend(msg) => ResetError::Directory(msg),
        }
    }
}

/// Password-reset flow over the OTP service
pub struct PasswordResetFlow {
    otp: Arc<OtpService>,
    directory: Arc<dyn UserDirectory>,
}

impl PasswordResetFlow {
    pub fn new(otp: Arc<OtpService>, directory: Arc<dyn UserDirectory>) -> Self {
        Self { otp, directory }
    }

    /// "Forgot password": issue a reset code for the account behind `email`.
    /// Delivery of the code is the OTP service's best-effort side effect.
    pub async fn request(&self, email: &str) -> Result<Uuid, ResetError> {
        let user = self.directory.find_by_email(email).await?;

        self.otp
            .generate(&user, OtpAction::PasswordReset)
            .await?;

        info!("Password reset requested for user {}", user.id);
        Ok(user.id)
    }

    /// Check a submitted reset code. Success opens the confirmation window
    /// within which `confirm` must complete the change.
    pub async fn verify(&self, email: &str, code: &str) -> Result<Uuid, ResetError> {
        let user = self.directory.find_by_email(email).await?;

        self.otp
            .verify(user.id, OtpAction::PasswordReset, code)
            .await?;

        Ok(user.id)
    }

    /// Complete the reset: consume the confirmation entry and store the new
    /// password hash.
    pub async fn confirm(
        &self,
        user_id: Uuid,
        code: &str,
        new_password: &str,
    ) -> Result<(), ResetError> {
        if new_password.is_empty() {
            return Err(ResetError::InvalidPassword("must not be blank".to_string()));
        }

        // Resolve the user first so an unknown id reads as UserNotFound
        // rather than a missing confirmation entry
        let user = self.directory.find_by_id(user_id).await?;

        self.otp
            .confirm(user.id, OtpAction::PasswordReset, code)
            .await?;

        let hash = bcrypt::hash(new_password, bcrypt::DEFAULT_COST)
            .map_err(|e| ResetError::Hash(e.to_string()))?;
        self.directory.set_password_hash(user.id, &hash).await?;

        info!("Password reset completed for user {}", user.id);
        Ok(())
    }

    /// Change the password of a signed-in user, gated on the current one.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ResetError> {
        if new_password.is_empty() {
            return Err(ResetError::InvalidPassword("must not be blank".to_string()));
        }

        let user = self.directory.find_by_id(user_id).await?;

        let matches = bcrypt::verify(current_password, &user.password_hash)
            .map_err(|e| ResetError::Hash(e.to_string()))?;
        if !matches {
            return Err(ResetError::InvalidCurrentPassword);
        }

        let hash = bcrypt::hash(new_password, bcrypt::DEFAULT_COST)
            .map_err(|e| ResetError::Hash(e.to_string()))?;
        self.directory.set_password_hash(user.id, &hash).await?;

        info!("Password changed for user {}", user.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;
    use crate::models::User;
    use crate::notify::{MemoryNotifier, NotificationDispatcher};
    use crate::otp::OtpConfig;
    use crate::store::memory::MemoryStore;

    async fn test_flow() -> (PasswordResetFlow, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let dispatcher = NotificationDispatcher::start(Arc::new(MemoryNotifier::new()), 16);
        let otp = Arc::new(OtpService::new(store, dispatcher, OtpConfig::default()));

        let directory = Arc::new(MemoryDirectory::new());
        let user = User::new("applicant@example.com", "Jane", "Doe", "+1555000001");
        let user_id = user.id;
        directory.insert(user).await;

        (PasswordResetFlow::new(otp, directory), user_id)
    }

    #[tokio::test]
    async fn test_request_rejects_unknown_email() {
        let (flow, _) = test_flow().await;

        let result = flow.request("nobody@example.com").await;
        assert!(matches!(result, Err(ResetError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_confirm_requires_verified_code() {
        let (flow, user_id) = test_flow().await;

        flow.request("applicant@example.com").await.unwrap();

        // Skipping the verify step leaves no confirmation entry
        let result = flow.confirm(user_id, "123456", "new-password").await;
        assert!(matches!(result, Err(ResetError::Otp(OtpError::NotFound))));
    }

    #[tokio::test]
    async fn test_confirm_rejects_blank_password() {
        let (flow, user_id) = test_flow().await;

        let result = flow.confirm(user_id, "123456", "").await;
        assert!(matches!(result, Err(ResetError::InvalidPassword(_))));
    }

    #[tokio::test]
    async fn test_change_password_gates_on_current() {
        let (flow, user_id) = test_flow().await;

        // Seed a known password through the directory
        let hash = bcrypt::hash("old-password", bcrypt::DEFAULT_COST).unwrap();
        flow.directory.set_password_hash(user_id, &hash).await.unwrap();

        let result = flow
            .change_password(user_id, "wrong-password", "new-password")
            .await;
        assert!(matches!(result, Err(ResetError::InvalidCurrentPassword)));

        flow.change_password(user_id, "old-password", "new-password")
            .await
            .unwrap();

        let user = flow.directory.find_by_id(user_id).await.unwrap();
        assert!(bcrypt::verify("new-password", &user.password_hash).unwrap());
    }
}
