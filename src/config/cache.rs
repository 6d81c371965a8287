use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Where session records live.
///
/// With no `[cache]` table sessions stay in a process-local map.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum CacheConfig {
    #[default]
    None,

    /// Bounded map inside this process.
    Memory(MemoryCacheConfig),

    /// Shared Redis instance, for deployments with more than one node.
    Redis(RedisCacheConfig),
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::None => Ok(()),
            Self::Memory(memory) => memory.validate(),
            Self::Redis(redis) => redis.validate(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryCacheConfig {
    /// Upper bound on stored sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,

    /// How many live sessions to drop at once when the bound is hit and
    /// nothing has expired. Those closest to expiry go first.
    #[serde(default = "default_evict_batch")]
    pub evict_batch: usize,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_sessions: default_max_sessions(),
            evict_batch: default_evict_batch(),
        }
    }
}

impl MemoryCacheConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_sessions == 0 {
            return Err(ConfigError::Validation(
                "cache.max_sessions must be greater than 0".into(),
            ));
        }
        if self.evict_batch > self.max_sessions {
            return Err(ConfigError::Validation(
                "cache.evict_batch cannot exceed cache.max_sessions".into(),
            ));
        }
        Ok(())
    }
}

fn default_max_sessions() -> usize {
    50_000
}

fn default_evict_batch() -> usize {
    64
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedisCacheConfig {
    /// `redis://[user:password@]host:port[/db]`
    pub url: String,

    /// Prepended to every session key so several deployments can share one
    /// Redis database.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl RedisCacheConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::Validation("cache.url cannot be empty".into()));
        }
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ConfigError::Validation(format!(
                "cache.url must use redis:// or rediss://, got '{}'",
                self.url
            )));
        }
        if !cfg!(feature = "redis") {
            return Err(ConfigError::Validation(
                "cache.type = \"redis\" requires the `redis` feature".into(),
            ));
        }
        Ok(())
    }
}

fn default_key_prefix() -> String {
    "readgate:".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_bounds() {
        let zero = MemoryCacheConfig {
            max_sessions: 0,
            evict_batch: 0,
        };
        assert!(zero.validate().is_err());

        let oversized_batch = MemoryCacheConfig {
            max_sessions: 10,
            evict_batch: 11,
        };
        assert!(oversized_batch.validate().is_err());

        assert!(MemoryCacheConfig::default().validate().is_ok());
    }

    #[test]
    fn test_redis_url_scheme() {
        let config = RedisCacheConfig {
            url: "http://localhost:6379".into(),
            key_prefix: default_key_prefix(),
        };
        assert!(config.validate().is_err());
    }
}
