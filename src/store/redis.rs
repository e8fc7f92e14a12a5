// Redis-backed store
// Shares OTP state across instances; TTL enforcement is Redis's own

use super::*;
use ::redis::{aio::MultiplexedConnection, AsyncCommands, RedisError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Redis store backend; records are stored as JSON values with a Redis expiry
pub struct RedisStore {
    conn: Arc<Mutex<MultiplexedConnection>>,
}

impl RedisStore {
    /// Connect to the given Redis URL
    pub async fn connect(redis_url: &str) -> Result<Self, RedisError> {
        let client = ::redis::Client::open(redis_url)?;
        let conn = client.get_multiplexed_tokio_connection().await?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Redis key for an OTP record
    fn otp_key(&self, key: &OtpKey) -> String {
        format!("otp:{}", key)
    }

    /// Redis key for a confirmation entry
    fn confirmation_key(&self, key: &OtpKey) -> String {
        format!("otp_confirm:{}", key)
    }
}

fn redis_error(e: RedisError) -> StoreError {
    StoreError::ConnectionError(e.to_string())
}

fn encode(record: &OtpRecord) -> Result<String, StoreError> {
    serde_json::to_string(record).map_err(|e| StoreError::SerializationError(e.to_string()))
}

fn decode(raw: &str) -> Result<OtpRecord, StoreError> {
    serde_json::from_str(raw).map_err(|e| StoreError::SerializationError(e.to_string()))
}

fn ttl_secs(ttl: Duration) -> u64 {
    ttl.num_seconds().max(1) as u64
}

#[async_trait]
impl OtpStore for RedisStore {
    async fn put_otp(
        &self,
        key: &OtpKey,
        record: OtpRecord,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let redis_key = self.otp_key(key);
        let value = encode(&record)?;
        let mut conn = self.conn.lock().await;

        conn.set_ex::<_, _, ()>(redis_key, value, ttl_secs(ttl))
            .await
            .map_err(redis_error)
    }

    async fn get_otp(&self, key: &OtpKey) -> Result<Option<OtpRecord>, StoreError> {
        let redis_key = self.otp_key(key);
        let mut conn = self.conn.lock().await;

        let raw: Option<String> = conn.get(redis_key).await.map_err(redis_error)?;
        raw.as_deref().map(decode).transpose()
    }

    async fn update_otp(&self, key: &OtpKey, record: OtpRecord) -> Result<(), StoreError> {
        let redis_key = self.otp_key(key);
        let value = encode(&record)?;
        let mut conn = self.conn.lock().await;

        // SET XX KEEPTTL: only overwrite an existing key, keeping its expiry
        let reply: Option<String> = ::redis::cmd("SET")
            .arg(&redis_key)
            .arg(value)
            .arg("XX")
            .arg("KEEPTTL")
            .query_async(&mut *conn)
            .await
            .map_err(redis_error)?;

        match reply {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_otp(&self, key: &OtpKey) -> Result<(), StoreError> {
        let redis_key = self.otp_key(key);
        let mut conn = self.conn.lock().await;

        conn.del::<_, ()>(redis_key).await.map_err(redis_error)
    }

    async fn put_confirmation(
        &self,
        key: &OtpKey,
        code: &str,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let redis_key = self.confirmation_key(key);
        let mut conn = self.conn.lock().await;

        conn.set_ex::<_, _, ()>(redis_key, code, ttl_secs(ttl))
            .await
            .map_err(redis_error)
    }

    async fn get_confirmation(&self, key: &OtpKey) -> Result<Option<String>, StoreError> {
        let redis_key = self.confirmation_key(key);
        let mut conn = self.conn.lock().await;

        conn.get(redis_key).await.map_err(redis_error)
    }

    async fn delete_confirmation(&self, key: &OtpKey) -> Result<(), StoreError> {
        let redis_key = self.confirmation_key(key);
        let mut conn = self.conn.lock().await;

        conn.del::<_, ()>(redis_key).await.map_err(redis_error)
    }

    async fn cleanup_expired(&self) -> Result<usize, StoreError> {
        // Redis expires keys on its own
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otp::OtpAction;
    use uuid::Uuid;

    #[test]
    fn test_key_formatting() {
        let store_key = OtpKey::new(Uuid::nil(), OtpAction::PasswordReset);
        let formatted = format!("otp:{}", store_key);

        assert_eq!(
            formatted,
            "otp:00000000-0000-0000-0000-000000000000:password_reset"
        );
    }

    #[test]
    fn test_record_json_round_trip() {
        let record = OtpRecord::issue(OtpAction::OfferAcceptance, &Default::default());
        let decoded = decode(&encode(&record).unwrap()).unwrap();

        assert_eq!(decoded.code, record.code);
        assert_eq!(decoded.action, record.action);
    }

    #[test]
    fn test_ttl_never_rounds_to_zero() {
        assert_eq!(ttl_secs(Duration::milliseconds(100)), 1);
        assert_eq!(ttl_secs(Duration::seconds(180)), 180);
    }
}
