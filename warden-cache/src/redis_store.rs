//! Redis-backed cache store.
//!
//! Credential mappings are plain string keys (`GET thing_key:<key>`), channel
//! membership is a Redis set (`SISMEMBER channel:<id> <thing id>`). The store
//! wraps a [`ConnectionManager`], which multiplexes one connection across all
//! clones and reconnects with exponential backoff after a drop; cloning the
//! store is cheap and every clone shares that connection.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, ErrorKind, RedisError};
use tracing::debug;
use warden_core::{CacheError, CacheStoreConfig, ChannelId, Credential, ThingId};

use crate::keys::NamespacedKey;
use crate::traits::{CacheStore, CacheWriter};

/// [`CacheStore`] + [`CacheWriter`] over a shared Redis connection.
#[derive(Clone)]
pub struct RedisCacheStore {
    manager: ConnectionManager,
}

impl RedisCacheStore {
    /// Connect using the cache section of the Warden configuration.
    pub async fn connect(config: &CacheStoreConfig) -> Result<Self, CacheError> {
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            CacheError::Unavailable {
                reason: format!("invalid redis url: {}", e),
            }
        })?;

        let manager_config = ConnectionManagerConfig::new()
            .set_number_of_retries(config.reconnect_retries)
            .set_exponent_base(config.reconnect_backoff_base)
            .set_max_delay(config.reconnect_max_delay_ms)
            .set_response_timeout(config.response_timeout())
            .set_connection_timeout(config.connection_timeout());

        let manager = ConnectionManager::new_with_config(client, manager_config)
            .await
            .map_err(|e| CacheError::Unavailable {
                reason: format!("failed to connect to redis: {}", e),
            })?;

        debug!(
            response_timeout_ms = config.response_timeout_ms,
            reconnect_retries = config.reconnect_retries,
            "Redis cache store connected"
        );
        Ok(Self { manager })
    }

    /// Wrap an existing connection manager shared with other components.
    pub fn from_manager(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    fn connection(&self) -> ConnectionManager {
        self.manager.clone()
    }
}

fn map_redis_error(key: &NamespacedKey, err: RedisError) -> CacheError {
    if err.is_timeout() {
        CacheError::Timeout {
            key: key.to_string(),
        }
    } else if err.kind() == ErrorKind::TypeError {
        CacheError::Malformed {
            key: key.to_string(),
            reason: err.to_string(),
        }
    } else {
        CacheError::Unavailable {
            reason: err.to_string(),
        }
    }
}

#[async_trait]
impl CacheStore for RedisCacheStore {
    async fn get_mapping(&self, key: &NamespacedKey) -> Result<Option<ThingId>, CacheError> {
        let mut conn = self.connection();
        let value: Option<String> = conn
            .get(key.encode())
            .await
            .map_err(|e| map_redis_error(key, e))?;

        value
            .map(|raw| {
                ThingId::try_new(raw).map_err(|e| CacheError::Malformed {
                    key: key.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    async fn is_member(&self, key: &NamespacedKey, member: &ThingId) -> Result<bool, CacheError> {
        let mut conn = self.connection();
        conn.sismember(key.encode(), member.as_str())
            .await
            .map_err(|e| map_redis_error(key, e))
    }
}

#[async_trait]
impl CacheWriter for RedisCacheStore {
    async fn put_mapping(
        &self,
        credential: &Credential,
        thing_id: &ThingId,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let key = NamespacedKey::thing_key(credential);
        let mut conn = self.connection();
        let result: Result<(), RedisError> = match ttl {
            // Redis rejects a zero expiry; an already-expired mapping is an absent one.
            Some(ttl) if ttl.is_zero() => conn.del(key.encode()).await,
            Some(ttl) => {
                let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
                conn.pset_ex(key.encode(), thing_id.as_str(), millis).await
            }
            None => conn.set(key.encode(), thing_id.as_str()).await,
        };
        result.map_err(|e| map_redis_error(&key, e))
    }

    async fn remove_mapping(&self, credential: &Credential) -> Result<(), CacheError> {
        let key = NamespacedKey::thing_key(credential);
        let mut conn = self.connection();
        let result: Result<(), RedisError> = conn.del(key.encode()).await;
        result.map_err(|e| map_redis_error(&key, e))
    }

    async fn add_member(&self, channel_id: &ChannelId, thing_id: &ThingId) -> Result<(), CacheError> {
        let key = NamespacedKey::channel(channel_id);
        let mut conn = self.connection();
        let result: Result<(), RedisError> = conn.sadd(key.encode(), thing_id.as_str()).await;
        result.map_err(|e| map_redis_error(&key, e))
    }

    async fn remove_member(
        &self,
        channel_id: &ChannelId,
        thing_id: &ThingId,
    ) -> Result<(), CacheError> {
        let key = NamespacedKey::channel(channel_id);
        let mut conn = self.connection();
        let result: Result<(), RedisError> = conn.srem(key.encode(), thing_id.as_str()).await;
        result.map_err(|e| map_redis_error(&key, e))
    }

    async fn remove_channel(&self, channel_id: &ChannelId) -> Result<(), CacheError> {
        let key = NamespacedKey::channel(channel_id);
        let mut conn = self.connection();
        let result: Result<(), RedisError> = conn.del(key.encode()).await;
        result.map_err(|e| map_redis_error(&key, e))
    }
}
