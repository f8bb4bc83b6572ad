//! Time-bounded dedup markers for sweep notifications.
//!
//! A non-expired marker means "this owner was already notified about this
//! logical event"; absence means "notify now". Markers are written by the
//! sweep path only after the notifier ran without a channel failure, so a
//! failed send is retried on the next cycle instead of being silenced for
//! the whole TTL window.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Canonical marker key: `notify:<entityKind>:<eventKind>:<entityId>`.
pub fn dedup_key(entity_kind: &str, event_kind: &str, entity_id: impl std::fmt::Display) -> String {
    format!("notify:{entity_kind}:{event_kind}:{entity_id}")
}

/// Marker store seam. Single-instance deployments use the in-memory
/// implementation; the contract is all the sweep path depends on.
#[async_trait]
pub trait DedupCache: Send + Sync {
    /// True iff a non-expired marker exists for `key`.
    async fn exists(&self, key: &str) -> bool;

    /// Write (or refresh) a marker that expires after `ttl`.
    async fn put(&self, key: &str, ttl: Duration);
}

/// In-process TTL map. Expired entries are swept out on every write so the
/// map stays bounded by the live marker count.
#[derive(Clone, Default)]
pub struct InMemoryDedupCache {
    inner: Arc<RwLock<HashMap<String, Instant>>>,
}

impl InMemoryDedupCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DedupCache for InMemoryDedupCache {
    async fn exists(&self, key: &str) -> bool {
        let inner = self.inner.read().await;
        inner
            .get(key)
            .is_some_and(|expires_at| *expires_at > Instant::now())
    }

    async fn put(&self, key: &str, ttl: Duration) {
        let now = Instant::now();
        let mut inner = self.inner.write().await;
        inner.retain(|_, expires_at| *expires_at > now);
        inner.insert(key.to_string(), now + ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_format() {
        let id = uuid::Uuid::nil();
        assert_eq!(
            dedup_key("repair-order", "completed", id),
            format!("notify:repair-order:completed:{id}")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn marker_expires_after_ttl() {
        let cache = InMemoryDedupCache::new();
        let key = dedup_key("repair-order", "completed", 7);

        assert!(!cache.exists(&key).await);
        cache.put(&key, Duration::from_secs(60)).await;
        assert!(cache.exists(&key).await);

        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(cache.exists(&key).await);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!cache.exists(&key).await);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_markers_are_purged_on_write() {
        let cache = InMemoryDedupCache::new();
        cache.put("a", Duration::from_secs(1)).await;
        tokio::time::advance(Duration::from_secs(2)).await;
        cache.put("b", Duration::from_secs(10)).await;

        let inner = cache.inner.read().await;
        assert!(!inner.contains_key("a"));
        assert!(inner.contains_key("b"));
    }
}
