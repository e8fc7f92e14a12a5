// OTP service: generate, verify, confirm
//
// Lifecycle of a code: Issued -> Verified | Expired | Exhausted, all terminal.
// A successful verification opens a short confirmation window during which
// exactly one follow-up action (e.g. the actual password change) is permitted.

use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{AppConfig, User};
use crate::notify::{NotificationDispatcher, OtpNotification};
use crate::store::{create_store, OtpKey, OtpStore};

use super::types::{OtpAction, OtpConfig, OtpError, OtpRecord};

/// OTP verification service
pub struct OtpService {
    store: Arc<dyn OtpStore>,
    dispatcher: NotificationDispatcher,
    config: OtpConfig,
}

impl OtpService {
    pub fn new(
        store: Arc<dyn OtpStore>,
        dispatcher: NotificationDispatcher,
        config: OtpConfig,
    ) -> Self {
        Self {
            store,
            dispatcher,
            config,
        }
    }

    /// Assemble the service from application configuration: the configured
    /// store backend plus a dispatcher over the log transport.
    pub async fn from_config(config: &AppConfig) -> Result<Self, OtpError> {
        let store: Arc<dyn OtpStore> = Arc::from(create_store(&config.store).await?);
        let dispatcher = NotificationDispatcher::from_config(&config.dispatch);

        Ok(Self::new(store, dispatcher, config.otp.clone()))
    }

    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    /// Issue a fresh code for (user, action), overwriting any prior one, and
    /// queue its delivery. Delivery is best-effort and never fails the caller.
    pub async fn generate(&self, user: &User, action: OtpAction) -> Result<String, OtpError> {
        let key = OtpKey::new(user.id, action);
        let record = OtpRecord::issue(action, &self.config);
        let code = record.code.clone();

        self.store
            .put_otp(&key, record, self.config.retention_window())
            .await?;

        // A reissued code also invalidates any open confirmation window
        self.store.delete_confirmation(&key).await?;

        info!("Issued {} code for user {}", action, user.id);

        self.dispatcher.enqueue(OtpNotification {
            recipient: user.email.clone(),
            display_name: user.display_name(),
            code: code.clone(),
            action,
        });

        Ok(code)
    }

    /// Verify a submitted code against the active record for (user, action).
    ///
    /// On success the record is consumed and a confirmation entry is written
    /// with the short secondary TTL. Expiry and exhaustion are checked before
    /// the code is compared, so a correct code past either limit still fails.
    pub async fn verify(
        &self,
        user_id: Uuid,
        action: OtpAction,
        submitted: &str,
    ) -> Result<(), OtpError> {
        let key = OtpKey::new(user_id, action);

        let mut record = self.store.get_otp(&key).await?.ok_or(OtpError::NotFound)?;

        if record.is_expired(&self.config) {
            warn!("Rejected expired {} code for user {}", action, user_id);
            return Err(OtpError::Expired);
        }

        if record.is_exhausted(&self.config) {
            warn!(
                "Rejected {} code for user {}: attempt limit reached",
                action, user_id
            );
            return Err(OtpError::AttemptsExceeded);
        }

        if record.code != submitted {
            record.tries += 1;
            let exhausted = record.is_exhausted(&self.config);

            // Two racing verifications can read the same tries count here;
            // the counter is advisory, not a security boundary.
            self.store.update_otp(&key, record).await?;

            return Err(if exhausted {
                warn!(
                    "{} code for user {} invalidated after too many failures",
                    action, user_id
                );
                OtpError::AttemptsExceeded
            } else {
                OtpError::Mismatch
            });
        }

        // Single use: consume the record, open the confirmation window
        self.store.delete_otp(&key).await?;
        self.store
            .put_confirmation(&key, submitted, self.config.confirm_window())
            .await?;

        info!("Verified {} code for user {}", action, user_id);
        Ok(())
    }

    /// Consume the confirmation entry opened by a successful `verify`.
    /// Fails with `NotFound` once the secondary window has lapsed or the
    /// entry was already consumed.
    pub async fn confirm(
        &self,
        user_id: Uuid,
        action: OtpAction,
        submitted: &str,
    ) -> Result<(), OtpError> {
        let key = OtpKey::new(user_id, action);

        let cached = self
            .store
            .get_confirmation(&key)
            .await?
            .ok_or(OtpError::NotFound)?;

        if cached != submitted {
            warn!(
                "Rejected {} confirmation for user {}: code mismatch",
                action, user_id
            );
            return Err(OtpError::Mismatch);
        }

        self.store.delete_confirmation(&key).await?;

        info!("Consumed {} confirmation for user {}", action, user_id);
        Ok(())
    }
}
