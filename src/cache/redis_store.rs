use super::{CacheError, CacheStore};
use crate::settings::RedisSettings;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;

/// Shared cache in Redis
///
/// The connection manager multiplexes every request over one connection and
/// reconnects on failure, so cloning it per call is cheap.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Connect to the configured Redis instance
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the first connection fails
    pub async fn connect(settings: &RedisSettings) -> Result<Self, CacheError> {
        let client = redis::Client::open(settings.connection_url().as_str())?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }
}

/// TTL in milliseconds for `PSETEX`, never zero
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Stored bytes as text; anything else was not written by this service
fn decode_value(bytes: Vec<u8>) -> Result<String, CacheError> {
    String::from_utf8(bytes).map_err(|e| CacheError::Corrupt(e.to_string()))
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut connection = self.connection.clone();
        let value: Option<Vec<u8>> = connection.get(key).await?;
        value.map(decode_value).transpose()
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        connection
            .pset_ex::<_, _, ()>(key, value, ttl_millis(ttl))
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut connection = self.connection.clone();
        connection.del::<_, ()>(key).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_millis() {
        assert_eq!(ttl_millis(Duration::from_secs(900)), 900_000);
        assert_eq!(ttl_millis(Duration::from_micros(10)), 1);
    }

    #[test]
    fn test_decode_value() {
        assert_eq!(
            decode_value(br#"{"subject":"42"}"#.to_vec()).unwrap(),
            r#"{"subject":"42"}"#
        );
        assert!(matches!(
            decode_value(vec![0xff, 0xfe]),
            Err(CacheError::Corrupt(_))
        ));
    }

    fn local_settings() -> RedisSettings {
        RedisSettings {
            host: std::env::var("REDIS_TEST_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: 6379,
            db: 15,
            password: String::new(),
        }
    }

    #[tokio::test]
    #[ignore = "needs a redis server, set REDIS_TEST_HOST"]
    async fn test_round_trip_and_binary_entry_against_redis() {
        let store = RedisStore::connect(&local_settings()).await.unwrap();
        let key = "ghost:redis-store-test";

        store
            .set(key, r#"{"subject":"42"}"#.to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(
            store.get(key).await.unwrap().as_deref(),
            Some(r#"{"subject":"42"}"#)
        );

        let mut raw = store.connection.clone();
        raw.set::<_, _, ()>(key, vec![0xffu8, 0xfe]).await.unwrap();
        assert!(matches!(store.get(key).await, Err(CacheError::Corrupt(_))));

        store.delete(key).await.unwrap();
        assert_eq!(store.get(key).await.unwrap(), None);
        store.delete(key).await.unwrap();
    }
}
