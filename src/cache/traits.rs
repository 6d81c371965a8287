use std::time::Duration;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};

use super::error::CacheResult;

/// Byte-oriented key-value store with per-key expiry.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn fetch(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Write `value` under `key`, replacing any previous value. The entry
    /// disappears once `ttl` has elapsed; `ttl` must be non-zero.
    async fn store(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;

    /// Remove `key`. Missing keys are not an error.
    async fn evict(&self, key: &str) -> CacheResult<()>;
}

impl dyn Cache {
    /// Fetch and decode a JSON document.
    pub async fn fetch_json<T: DeserializeOwned>(&self, key: &str) -> CacheResult<Option<T>> {
        let Some(bytes) = self.fetch(key).await? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Encode `value` as JSON and store it.
    pub async fn store_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> CacheResult<()> {
        let bytes = serde_json::to_vec(value)?;
        self.store(key, bytes, ttl).await
    }
}
