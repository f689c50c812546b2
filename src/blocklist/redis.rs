//! Redis block store.
//!
//! The block list is a single Redis SET, shared by every sender instance.
//! Redis executes each command atomically, so concurrent SADD/SREM/SISMEMBER
//! calls from different processes need no further coordination here.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use super::{BlockStore, Result, StoreError};

/// Reconnect attempts per operation. Lookups sit on the request path.
const CONNECT_RETRIES: usize = 1;
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(2);
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(2);

/// Redis-backed block store.
///
/// The connection is opened on first use, so a Redis outage at startup does
/// not stop the process; the first operation after recovery connects.
pub struct RedisBlockStore {
    client: Client,
    conn: OnceCell<ConnectionManager>,
    key: String,
}

impl RedisBlockStore {
    /// Create a new Redis block store.
    ///
    /// # Arguments
    /// * `url` - Redis connection URL (e.g., redis://localhost:6379)
    /// * `key` - Name of the SET holding blocked destinations
    pub fn new(url: &str, key: impl Into<String>) -> Result<Self> {
        let client = Client::open(url)?;

        Ok(Self {
            client,
            conn: OnceCell::new(),
            key: key.into(),
        })
    }

    /// Name of the backing SET.
    pub fn key(&self) -> &str {
        &self.key
    }

    async fn connection(&self) -> Result<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let config = ConnectionManagerConfig::new()
                    .set_number_of_retries(CONNECT_RETRIES)
                    .set_connection_timeout(CONNECTION_TIMEOUT)
                    .set_response_timeout(RESPONSE_TIMEOUT);
                let conn = ConnectionManager::new_with_config(self.client.clone(), config)
                    .await
                    .map_err(|e| StoreError::Connection(e.to_string()))?;
                info!(key = %self.key, "Connected to Redis for block list");
                Ok::<_, StoreError>(conn)
            })
            .await?;

        Ok(conn.clone())
    }
}

#[async_trait]
impl BlockStore for RedisBlockStore {
    async fn size(&self) -> Result<u64> {
        let mut conn = self.connection().await?;
        let size: u64 = conn.scard(&self.key).await?;
        Ok(size)
    }

    async fn is_member(&self, destination: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let member: bool = conn.sismember(&self.key, destination).await?;
        Ok(member)
    }

    async fn add(&self, destination: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let added: u64 = conn.sadd(&self.key, destination).await?;

        debug!(key = %self.key, phone_number = %destination, added, "SADD");
        Ok(added > 0)
    }

    async fn remove(&self, destination: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let removed: u64 = conn.srem(&self.key, destination).await?;

        debug!(key = %self.key, phone_number = %destination, removed, "SREM");
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_does_not_connect() {
        // Nothing listens on this port; construction must still succeed.
        let store = RedisBlockStore::new("redis://127.0.0.1:1", "sms:blocklist").unwrap();
        assert_eq!(store.key(), "sms:blocklist");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connection_error() {
        let store = RedisBlockStore::new("redis://127.0.0.1:1", "sms:blocklist").unwrap();
        assert!(matches!(
            store.is_member("+15551234567").await,
            Err(StoreError::Connection(_))
        ));
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        assert!(RedisBlockStore::new("not a url", "sms:blocklist").is_err());
    }
}
