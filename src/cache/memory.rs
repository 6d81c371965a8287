use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::{
    error::{CacheError, CacheResult},
    traits::Cache,
};
use crate::config::MemoryCacheConfig;

/// Process-local `Cache` on a `DashMap`.
///
/// Every key carries a deadline. When the map is full, stale keys are
/// dropped first, then the live keys nearest to their deadline.
pub struct MemoryCache {
    slots: DashMap<String, (Instant, Vec<u8>)>,
    max_sessions: usize,
    evict_batch: usize,
}

impl MemoryCache {
    pub fn new(config: &MemoryCacheConfig) -> Self {
        Self {
            slots: DashMap::new(),
            max_sessions: config.max_sessions,
            evict_batch: config.evict_batch.max(1),
        }
    }

    fn make_room(&self) {
        if self.slots.len() < self.max_sessions {
            return;
        }

        let now = Instant::now();
        self.slots.retain(|_, (deadline, _)| *deadline > now);
        if self.slots.len() < self.max_sessions {
            return;
        }

        let mut deadlines: Vec<(Instant, String)> = self
            .slots
            .iter()
            .map(|slot| (slot.value().0, slot.key().clone()))
            .collect();
        deadlines.sort_unstable();

        let excess = self.slots.len() + self.evict_batch - self.max_sessions;
        for (_, key) in deadlines.into_iter().take(excess) {
            self.slots.remove(&key);
        }
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn fetch(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let now = Instant::now();
        match self.slots.get(key) {
            None => return Ok(None),
            Some(slot) if slot.0 > now => return Ok(Some(slot.1.clone())),
            Some(_) => {}
        }
        // The read guard is gone; a concurrent store may have refreshed it.
        self.slots
            .remove_if(key, |_, (deadline, _)| *deadline <= now);
        Ok(None)
    }

    async fn store(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()> {
        if ttl.is_zero() {
            return Err(CacheError::ZeroTtl(key.to_string()));
        }
        if !self.slots.contains_key(key) {
            self.make_room();
        }
        self.slots
            .insert(key.to_string(), (Instant::now() + ttl, value));
        Ok(())
    }

    async fn evict(&self, key: &str) -> CacheResult<()> {
        self.slots.remove(key);
        Ok(())
    }
}
