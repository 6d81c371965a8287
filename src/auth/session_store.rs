//! Where session records are kept between requests.

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::SessionProfile;
use crate::{
    cache::{Cache, CacheResult},
    observability::metrics,
};

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session cache error: {0}")]
    Cache(String),
}

/// One browser session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: Uuid,

    /// Set once the reader has logged in.
    #[serde(default)]
    pub profile: Option<SessionProfile>,

    /// Local path to return to after login.
    #[serde(default)]
    pub login_redirect: Option<String>,

    /// Cookie and record lifetime.
    pub max_age_secs: u64,

    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(max_age_secs: u64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            profile: None,
            login_redirect: None,
            max_age_secs,
            created_at: now,
            expires_at: now + chrono::Duration::seconds(max_age_secs as i64),
        }
    }

    /// Change the lifetime, counted from now.
    pub fn set_max_age(&mut self, max_age_secs: u64) {
        self.max_age_secs = max_age_secs;
        self.expires_at = Utc::now() + chrono::Duration::seconds(max_age_secs as i64);
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Time left before expiry; zero once expired.
    pub fn ttl(&self) -> Duration {
        (self.expires_at - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Fetch a live session. Expired records read as `None`.
    async fn load(&self, id: Uuid) -> SessionResult<Option<SessionRecord>>;

    /// Insert or replace a session.
    async fn save(&self, record: &SessionRecord) -> SessionResult<()>;

    async fn delete(&self, id: Uuid) -> SessionResult<()>;
}

pub type SharedSessionStore = Arc<dyn SessionStore>;

/// Process-local sessions, lost on restart.
#[derive(Default)]
pub struct MemorySessionStore {
    records: RwLock<HashMap<Uuid, SessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, id: Uuid) -> SessionResult<Option<SessionRecord>> {
        let records = self.records.read().await;
        Ok(records.get(&id).filter(|r| !r.is_expired()).cloned())
    }

    /// Expired records are swept on every write.
    async fn save(&self, record: &SessionRecord) -> SessionResult<()> {
        let mut records = self.records.write().await;
        records.retain(|_, r| !r.is_expired());
        records.insert(record.id, record.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> SessionResult<()> {
        self.records.write().await.remove(&id);
        Ok(())
    }
}

/// Sessions as JSON documents in a [`Cache`], keyed `session:{id}` and
/// expiring with the record. Shared across nodes when the cache is Redis.
pub struct CacheSessionStore {
    cache: Arc<dyn Cache>,
}

impl CacheSessionStore {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    fn key(id: Uuid) -> String {
        format!("session:{id}")
    }
}

/// Count the outcome of one cache call and convert its error.
fn observe<T>(
    operation: &str,
    result: CacheResult<T>,
    label: impl FnOnce(&T) -> &'static str,
) -> SessionResult<T> {
    match result {
        Ok(value) => {
            metrics::record_session_operation(operation, label(&value));
            Ok(value)
        }
        Err(e) => {
            metrics::record_session_operation(operation, "error");
            tracing::warn!(operation, error = %e, "Session store operation failed");
            Err(SessionError::Cache(e.to_string()))
        }
    }
}

#[async_trait]
impl SessionStore for CacheSessionStore {
    async fn load(&self, id: Uuid) -> SessionResult<Option<SessionRecord>> {
        let fetched = self.cache.fetch_json::<SessionRecord>(&Self::key(id)).await;
        let record = observe("load", fetched, |r| if r.is_some() { "hit" } else { "miss" })?;

        match record {
            // Redis rounds TTLs up to whole seconds.
            Some(r) if r.is_expired() => {
                self.delete(id).await?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    async fn save(&self, record: &SessionRecord) -> SessionResult<()> {
        let ttl = record.ttl();
        if ttl.is_zero() {
            return self.delete(record.id).await;
        }
        let stored = self
            .cache
            .store_json(&Self::key(record.id), record, ttl)
            .await;
        observe("save", stored, |_| "ok")
    }

    async fn delete(&self, id: Uuid) -> SessionResult<()> {
        let evicted = self.cache.evict(&Self::key(id)).await;
        observe("delete", evicted, |_| "ok")
    }
}

/// The cache-backed store when a cache is configured, otherwise the
/// in-process map.
pub fn create_session_store(cache: Option<Arc<dyn Cache>>) -> SharedSessionStore {
    let Some(cache) = cache else {
        tracing::warn!("No [cache] configured; sessions are kept in process memory only");
        return Arc::new(MemorySessionStore::new());
    };
    tracing::info!("Sessions are stored in the configured cache");
    Arc::new(CacheSessionStore::new(cache))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{cache::MemoryCache, config::MemoryCacheConfig};

    #[tokio::test]
    async fn test_memory_session_store() {
        let store = MemorySessionStore::new();
        let mut record = SessionRecord::new(3600);
        record.login_redirect = Some("/book/12".into());

        store.save(&record).await.unwrap();
        let loaded = store.load(record.id).await.unwrap().unwrap();
        assert_eq!(loaded.login_redirect.as_deref(), Some("/book/12"));

        store.delete(record.id).await.unwrap();
        assert!(store.load(record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_record_reads_as_missing() {
        let store = MemorySessionStore::new();
        let mut record = SessionRecord::new(3600);
        record.expires_at = Utc::now() - chrono::Duration::seconds(1);

        store.save(&record).await.unwrap();
        assert!(store.load(record.id).await.unwrap().is_none());

        store.save(&SessionRecord::new(3600)).await.unwrap();
        assert_eq!(store.records.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_cache_session_store() {
        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new(&MemoryCacheConfig::default()));
        let store = CacheSessionStore::new(cache);
        let record = SessionRecord::new(60);

        store.save(&record).await.unwrap();
        let loaded = store.load(record.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, record.id);
        assert!(loaded.profile.is_none());

        store.delete(record.id).await.unwrap();
        assert!(store.load(record.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cache_store_drops_expired_record_on_save() {
        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new(&MemoryCacheConfig::default()));
        let store = CacheSessionStore::new(cache.clone());
        let mut record = SessionRecord::new(60);
        store.save(&record).await.unwrap();

        record.expires_at = Utc::now() - chrono::Duration::seconds(1);
        store.save(&record).await.unwrap();

        assert!(cache.fetch(&format!("session:{}", record.id)).await.unwrap().is_none());
    }

    #[test]
    fn test_set_max_age_moves_expiry() {
        let mut record = SessionRecord::new(60);
        record.set_max_age(86400 * 30);
        assert_eq!(record.max_age_secs, 86400 * 30);
        assert!(record.ttl() > Duration::from_secs(86400 * 29));
    }
}
