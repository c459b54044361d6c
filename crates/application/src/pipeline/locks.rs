//! Lazily created per-key async locks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};

type LockTable = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

/// Table of async mutexes keyed by string.
///
/// Requests with the same key are serialized; requests with different keys
/// never wait on each other. An entry is removed as soon as no request holds
/// or waits for it. Clones share the same table.
#[derive(Clone, Default)]
pub struct KeyedLocks {
    table: LockTable,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for the lock on `key`, giving up with `Cancelled` if `cancel` fires first.
    pub async fn lock(&self, key: &str, cancel: &CancellationToken) -> Result<KeyGuard> {
        let entry = self.entry(key);
        let acquire = entry.lock.clone().lock_owned();

        let guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            guard = acquire => Some(guard),
        };

        match guard {
            Some(guard) => Ok(KeyGuard {
                _guard: guard,
                _entry: entry,
            }),
            None => Err(AppError::Cancelled),
        }
    }

    /// Number of keys currently held or waited on.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, key: &str) -> Entry {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        let lock = table
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();

        Entry {
            table: self.table.clone(),
            key: key.to_string(),
            lock,
        }
    }
}

/// A claim on a table entry; prunes the entry when the last claim goes away.
struct Entry {
    table: LockTable,
    key: String,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for Entry {
    fn drop(&mut self) {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference lives in the table, one here.
        if Arc::strong_count(&self.lock) == 2 {
            table.remove(&self.key);
        }
    }
}

/// Holds the lock for one key until dropped.
pub struct KeyGuard {
    // Field order matters: the mutex guard is released before the entry is pruned.
    _guard: OwnedMutexGuard<()>,
    _entry: Entry,
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_entries_are_pruned_after_release() {
        let locks = KeyedLocks::new();
        let cancel = CancellationToken::new();

        let guard = locks.lock("a", &cancel).await.unwrap();
        assert_eq!(locks.len(), 1);
        drop(guard);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = KeyedLocks::new();
        let cancel = CancellationToken::new();

        let guard = locks.lock("a", &cancel).await.unwrap();
        let waiter = {
            let locks = locks.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { locks.lock("a", &cancel).await.map(|_| ()) })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap().unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let cancel = CancellationToken::new();

        let _a = locks.lock("a", &cancel).await.unwrap();
        let _b = locks.lock("b", &cancel).await.unwrap();
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_wait_releases_its_claim() {
        let locks = KeyedLocks::new();
        let holder_cancel = CancellationToken::new();
        let guard = locks.lock("a", &holder_cancel).await.unwrap();

        let cancel = CancellationToken::new();
        let waiter = {
            let locks = locks.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { locks.lock("a", &cancel).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        assert!(matches!(waiter.await.unwrap(), Err(AppError::Cancelled)));
        drop(guard);
        assert!(locks.is_empty());
    }
}
