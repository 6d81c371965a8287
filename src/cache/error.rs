use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Invalid cached JSON: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Zero TTL for key '{0}'")]
    ZeroTtl(String),

    #[cfg(feature = "redis")]
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

pub type CacheResult<T> = Result<T, CacheError>;
