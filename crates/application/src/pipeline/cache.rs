//! Process-wide memoization cache.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Key/value cache with per-entry time-to-live.
///
/// Values are JSON so a single cache can hold every response type.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Returns the live value under `key`, if any.
    async fn get(&self, key: &str) -> Option<Value>;

    async fn set(&self, key: &str, value: Value, ttl: Duration);

    async fn remove(&self, key: &str);

    /// Removes every entry whose key starts with `prefix`.
    async fn remove_prefix(&self, prefix: &str);
}

/// Minimum time between two sweeps of expired entries.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    /// `None` when the time-to-live is too large to represent.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

struct Entries {
    map: HashMap<String, Entry>,
    last_sweep: Instant,
}

impl Entries {
    fn sweep(&mut self, now: Instant) {
        self.map.retain(|_, entry| entry.is_live(now));
        self.last_sweep = now;
    }
}

/// In-memory [`Cache`]. Clones share the same entries.
///
/// Expired entries are dropped when read, and all of them are swept on
/// the first write after [`SWEEP_INTERVAL`] has passed.
#[derive(Clone)]
pub struct InMemoryCache {
    entries: Arc<RwLock<Entries>>,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Entries {
                map: HashMap::new(),
                last_sweep: Instant::now(),
            })),
        }
    }
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.map.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drops expired entries.
    pub async fn purge_expired(&self) {
        self.entries.write().await.sweep(Instant::now());
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.map.get(key) {
                Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut entries = self.entries.write().await;
        // A writer may have replaced the entry between the two locks.
        if entries.map.get(key).is_some_and(|entry| !entry.is_live(now)) {
            entries.map.remove(key);
        }
        None
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        let now = Instant::now();
        let entry = Entry {
            value,
            expires_at: now.checked_add(ttl),
        };

        let mut entries = self.entries.write().await;
        if now.duration_since(entries.last_sweep) >= SWEEP_INTERVAL {
            entries.sweep(now);
        }
        entries.map.insert(key.to_string(), entry);
    }

    async fn remove(&self, key: &str) {
        self.entries.write().await.map.remove(key);
    }

    async fn remove_prefix(&self, prefix: &str) {
        self.entries
            .write()
            .await
            .map
            .retain(|key, _| !key.starts_with(prefix));
    }
}
