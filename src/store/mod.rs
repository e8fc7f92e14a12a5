// Keyed short-lived store for OTP records and confirmation entries
// Provides pluggable backends; entries carry a TTL and lapse silently

pub mod memory;
pub mod redis;

use async_trait::async_trait;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::StoreConfig;
use crate::otp::{OtpAction, OtpRecord};

/// Typed key for store entries: one active record per (user, action) pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct OtpKey {
    pub user_id: Uuid,
    pub action: OtpAction,
}

impl OtpKey {
    pub fn new(user_id: Uuid, action: OtpAction) -> Self {
        Self { user_id, action }
    }
}

impl std::fmt::Display for OtpKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.user_id, self.action)
    }
}

/// Store backend trait for OTP records and short-lived confirmation entries
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Store a record against a key, replacing any existing one
    async fn put_otp(&self, key: &OtpKey, record: OtpRecord, ttl: Duration)
        -> Result<(), StoreError>;

    /// Fetch the active record for a key; lapsed entries read as absent
    async fn get_otp(&self, key: &OtpKey) -> Result<Option<OtpRecord>, StoreError>;

    /// Update an existing record in place, preserving its remaining TTL
    async fn update_otp(&self, key: &OtpKey, record: OtpRecord) -> Result<(), StoreError>;

    /// Remove the record for a key
    async fn delete_otp(&self, key: &OtpKey) -> Result<(), StoreError>;

    /// Store a confirmation entry opened by a successful verification
    async fn put_confirmation(
        &self,
        key: &OtpKey,
        code: &str,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Fetch the confirmation entry for a key; lapsed entries read as absent
    async fn get_confirmation(&self, key: &OtpKey) -> Result<Option<String>, StoreError>;

    /// Remove the confirmation entry for a key
    async fn delete_confirmation(&self, key: &OtpKey) -> Result<(), StoreError>;

    /// Prune lapsed entries, returning how many were removed
    async fn cleanup_expired(&self) -> Result<usize, StoreError>;
}

/// Store errors
#[derive(Debug, Clone)]
pub enum StoreError {
    NotFound,
    ConnectionError(String),
    SerializationError(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::NotFound => write!(f, "Entry not found"),
            StoreError::ConnectionError(msg) => write!(f, "Connection error: {}", msg),
            StoreError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

/// Factory function to create a store backend based on configuration
pub async fn create_store(config: &StoreConfig) -> Result<Box<dyn OtpStore>, StoreError> {
    match config {
        StoreConfig::Memory => Ok(Box::new(memory::MemoryStore::new())),
        StoreConfig::Redis { url } => {
            let store = self::redis::RedisStore::connect(url)
                .await
                .map_err(|e| StoreError::ConnectionError(e.to_string()))?;
            Ok(Box::new(store))
        }
    }
}
