//! Result cache: Redis-backed delivery receipts keyed by message id.
//!
//! Each entry is the JSON-encoded [`CachedDelivery`] written with `SET key
//! value EX ttl`. Entries expire on their own; the message row keeps
//! `sent = true` after its receipts are gone.

use std::future::Future;
use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use hub_common::error::DispatchError;
use hub_common::types::CachedDelivery;

/// Key/value contract for delivery receipts.
pub trait ResultCache: Send + Sync {
    /// Store `value` under `key`, replacing any previous entry and resetting its expiry.
    fn set(
        &self,
        key: &str,
        value: &CachedDelivery,
    ) -> impl Future<Output = Result<(), DispatchError>> + Send;

    /// Read the entry under `key`. A missing or expired key is `Ok(None)`.
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<CachedDelivery>, DispatchError>> + Send;
}

/// Redis implementation of [`ResultCache`].
#[derive(Clone)]
pub struct RedisResultCache {
    redis: ConnectionManager,
    ttl: Duration,
}

impl RedisResultCache {
    pub fn new(redis: ConnectionManager, ttl: Duration) -> Self {
        Self { redis, ttl }
    }

    /// Expiry in whole seconds; Redis rejects `EX 0`.
    fn ttl_seconds(&self) -> u64 {
        self.ttl.as_secs().max(1)
    }
}

impl ResultCache for RedisResultCache {
    async fn set(&self, key: &str, value: &CachedDelivery) -> Result<(), DispatchError> {
        let payload = serde_json::to_string(value)?;
        let mut redis = self.redis.clone();
        redis
            .set_ex::<_, _, ()>(key, payload, self.ttl_seconds())
            .await?;

        tracing::debug!(
            key,
            chunks = value.contents.len(),
            ttl_secs = self.ttl_seconds(),
            "Delivery receipts cached"
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<CachedDelivery>, DispatchError> {
        let mut redis = self.redis.clone();
        let payload: Option<String> = redis.get(key).await?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}
