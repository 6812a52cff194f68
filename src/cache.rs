use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

struct CacheEntry<V> {
    payload: V,
    stored_at: Instant,
}

/// Time-boxed response cache. Each tool owns one instance, keyed by the
/// resolved identifier plus a mode/parameter discriminator.
///
/// Expiry is lazy: a stale entry is treated as a miss but stays in the map
/// until a later `set` overwrites it. There is no size bound and no
/// single-flight guarantee; concurrent misses on the same key may each hit
/// the upstream and race to overwrite with equivalent payloads.
///
/// Timestamps come from `tokio::time::Instant`, so tests drive expiry with
/// the paused runtime clock instead of sleeping.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.stored_at.elapsed() < self.ttl {
            Some(entry.payload.clone())
        } else {
            None
        }
    }

    pub async fn set(&self, key: impl Into<String>, payload: V) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.into(),
            CacheEntry {
                payload,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}
