// In-memory store backend
// Uses HashMap with Mutex for thread-safe access; entries carry an absolute deadline

use super::*;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::debug;

struct Entry<T> {
    value: T,
    expires_at: DateTime<Utc>,
}

impl<T> Entry<T> {
    fn is_live(&self) -> bool {
        self.expires_at > Utc::now()
    }
}

/// In-memory store backend
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<OtpKey, Entry<OtpRecord>>>>,
    confirmations: Arc<Mutex<HashMap<OtpKey, Entry<String>>>>,
}

impl MemoryStore {
    /// Create a new in-memory store backend
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            confirmations: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::ConnectionError(format!("Lock poisoned: {}", e))
}

#[async_trait]
impl OtpStore for MemoryStore {
    async fn put_otp(
        &self,
        key: &OtpKey,
        record: OtpRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut records = self.records.lock().map_err(lock_error)?;

        records.insert(
            *key,
            Entry {
                value: record,
                expires_at: Utc::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get_otp(&self, key: &OtpKey) -> Result<Option<OtpRecord>, StoreError> {
        let records = self.records.lock().map_err(lock_error)?;

        Ok(records
            .get(key)
            .filter(|e| e.is_live())
            .map(|e| e.value.clone()))
    }

    async fn update_otp(&self, key: &OtpKey, record: OtpRecord) -> Result<(), StoreError> {
        let mut records = self.records.lock().map_err(lock_error)?;

        match records.get_mut(key).filter(|e| e.is_live()) {
            Some(entry) => {
                entry.value = record;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_otp(&self, key: &OtpKey) -> Result<(), StoreError> {
        let mut records = self.records.lock().map_err(lock_error)?;

        records.remove(key);
        Ok(())
    }

    async fn put_confirmation(
        &self,
        key: &OtpKey,
        code: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let mut confirmations = self.confirmations.lock().map_err(lock_error)?;

        confirmations.insert(
            *key,
            Entry {
                value: code.to_string(),
                expires_at: Utc::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get_confirmation(&self, key: &OtpKey) -> Result<Option<String>, StoreError> {
        let confirmations = self.confirmations.lock().map_err(lock_error)?;

        Ok(confirmations
            .get(key)
            .filter(|e| e.is_live())
            .map(|e| e.value.clone()))
    }

    async fn delete_confirmation(&self, key: &OtpKey) -> Result<(), StoreError> {
        let mut confirmations = self.confirmations.lock().map_err(lock_error)?;

        confirmations.remove(key);
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize, StoreError> {
        let mut removed = 0;

        {
            let mut records = self.records.lock().map_err(lock_error)?;
            let before = records.len();
            records.retain(|_, e| e.is_live());
            removed += before - records.len();
        }

        {
            let mut confirmations = self.confirmations.lock().map_err(lock_error)?;
            let before = confirmations.len();
            confirmations.retain(|_, e| e.is_live());
            removed += before - confirmations.len();
        }

        if removed > 0 {
            debug!("Cleaned up {} expired store entries", removed);
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otp::{OtpAction, OtpConfig};
    use uuid::Uuid;

    fn test_key() -> OtpKey {
        OtpKey::new(Uuid::new_v4(), OtpAction::PasswordReset)
    }

    fn test_record() -> OtpRecord {
        OtpRecord::issue(OtpAction::PasswordReset, &OtpConfig::default())
    }

    #[tokio::test]
    async fn test_otp_record_operations() {
        let store = MemoryStore::new();
        let key = test_key();
        let record = test_record();

        // Store
        store
            .put_otp(&key, record.clone(), Duration::minutes(10))
            .await
            .unwrap();

        // Get
        let retrieved = store.get_otp(&key).await.unwrap();
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().code, record.code);

        // Update
        let mut updated = record.clone();
        updated.tries = 2;
        store.update_otp(&key, updated).await.unwrap();
        assert_eq!(store.get_otp(&key).await.unwrap().unwrap().tries, 2);

        // Delete
        store.delete_otp(&key).await.unwrap();
        assert!(store.get_otp(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lapsed_entries_read_as_absent() {
        let store = MemoryStore::new();
        let key = test_key();

        store
            .put_otp(&key, test_record(), Duration::milliseconds(20))
            .await
            .unwrap();
        assert!(store.get_otp(&key).await.unwrap().is_some());

        tokio::time::sleep(std::time::Duration::from_millis(40)).await;
        assert!(store.get_otp(&key).await.unwrap().is_none());

        // Updating a lapsed entry is a NotFound
        let result = store.update_otp(&key, test_record()).await;
        assert!(matches!(result, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_put_replaces_existing_record() {
        let store = MemoryStore::new();
        let key = test_key();

        let first = test_record();
        let second = test_record();
        store
            .put_otp(&key, first, Duration::minutes(10))
            .await
            .unwrap();
        store
            .put_otp(&key, second.clone(), Duration::minutes(10))
            .await
            .unwrap();

        let retrieved = store.get_otp(&key).await.unwrap().unwrap();
        assert_eq!(retrieved.code, second.code);
        assert_eq!(retrieved.created_at, second.created_at);
    }

    #[tokio::test]
    async fn test_confirmation_operations() {
        let store = MemoryStore::new();
        let key = test_key();

        store
            .put_confirmation(&key, "123456", Duration::seconds(180))
            .await
            .unwrap();
        assert_eq!(
            store.get_confirmation(&key).await.unwrap(),
            Some("123456".to_string())
        );

        store.delete_confirmation(&key).await.unwrap();
        assert!(store.get_confirmation(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let store = MemoryStore::new();
        let live_key = test_key();
        let dead_key = test_key();

        store
            .put_otp(&live_key, test_record(), Duration::minutes(10))
            .await
            .unwrap();
        store
            .put_otp(&dead_key, test_record(), Duration::milliseconds(10))
            .await
            .unwrap();
        store
            .put_confirmation(&dead_key, "111111", Duration::milliseconds(10))
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(30)).await;

        let removed = store.cleanup_expired().await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.get_otp(&live_key).await.unwrap().is_some());
    }
}
