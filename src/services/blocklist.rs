//! Revocation store: tracks revoked token identities (`jti`) with a TTL
//! bounded by the token's own remaining validity.

use async_trait::async_trait;
use redis::{aio::ConnectionManager, Client};

#[async_trait]
pub trait TokenBlocklist: Send + Sync {
    /// Record `jti` as revoked. Idempotent: revoking twice is a no-op.
    async fn revoke(&self, jti: &str, ttl_seconds: i64) -> Result<(), anyhow::Error>;
    async fn is_revoked(&self, jti: &str) -> Result<bool, anyhow::Error>;
    async fn health_check(&self) -> Result<(), anyhow::Error>;
}

#[derive(Clone)]
pub struct RedisBlocklist {
    _client: Client,
    manager: ConnectionManager,
}

impl RedisBlocklist {
    pub async fn new(config: &crate::config::RedisConfig) -> Result<Self, anyhow::Error> {
        tracing::info!(url = %config.url, "Connecting to Redis");
        let client = Client::open(config.url.clone())?;

        // ConnectionManager reconnects automatically.
        let manager = client.get_connection_manager().await.map_err(|e| {
            tracing::error!("Failed to get Redis connection manager: {}", e);
            anyhow::anyhow!("Failed to connect to Redis: {}", e)
        })?;

        tracing::info!("Successfully connected to Redis");

        Ok(Self {
            _client: client,
            manager,
        })
    }
}

fn blocklist_key(jti: &str) -> String {
    format!("blocklist:{}", jti)
}

#[async_trait]
impl TokenBlocklist for RedisBlocklist {
    async fn revoke(&self, jti: &str, ttl_seconds: i64) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();

        // SET with EX overwrites any existing entry, so a double revoke
        // leaves exactly one entry. The TTL lets stale entries self-clean
        // no later than the token's own expiry.
        redis::cmd("SET")
            .arg(blocklist_key(jti))
            .arg("revoked")
            .arg("EX")
            .arg(ttl_seconds)
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to revoke token: {}", e))
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, anyhow::Error> {
        let mut conn = self.manager.clone();

        let exists: bool = redis::cmd("EXISTS")
            .arg(blocklist_key(jti))
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to check blocklist: {}", e))?;

        Ok(exists)
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        let mut conn = self.manager.clone();
        redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| anyhow::anyhow!("Redis health check failed: {}", e))
    }
}

/// In-memory blocklist for tests. TTLs are accepted and ignored.
#[derive(Default)]
pub struct MockBlocklist {
    revoked: std::sync::Mutex<std::collections::HashSet<String>>,
}

impl MockBlocklist {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TokenBlocklist for MockBlocklist {
    async fn revoke(&self, jti: &str, _ttl_seconds: i64) -> Result<(), anyhow::Error> {
        self.revoked
            .lock()
            .map_err(|e| anyhow::anyhow!("Mock blocklist mutex poisoned: {}", e))?
            .insert(jti.to_string());
        Ok(())
    }

    async fn is_revoked(&self, jti: &str) -> Result<bool, anyhow::Error> {
        let contains = self
            .revoked
            .lock()
            .map_err(|e| anyhow::anyhow!("Mock blocklist mutex poisoned: {}", e))?
            .contains(jti);
        Ok(contains)
    }

    async fn health_check(&self) -> Result<(), anyhow::Error> {
        Ok(())
    }
}
