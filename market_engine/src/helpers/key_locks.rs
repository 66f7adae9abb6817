//! Per-key async locks.
//!
//! The storage transactions already make every flow atomic. `KeyLocks` additionally queues flows that touch the same
//! user, review or chat, so they reach the database one at a time instead of contending for SQLite's write lock.
//!
//! Entries are held weakly: a key's mutex is dropped as soon as the last guard and waiter for it goes away.
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, Mutex, PoisonError, Weak},
};

use log::trace;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Number of registry entries above which dead entries are swept on the next lock.
const SWEEP_THRESHOLD: usize = 256;

#[derive(Clone, Default)]
pub struct KeyLocks {
    locks: Arc<Mutex<HashMap<String, Weak<AsyncMutex<()>>>>>,
}

/// Holds the lock for one key until dropped.
pub struct KeyGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl KeyGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Debug for KeyLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyLocks ({} live keys)", self.live_keys())
    }
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no one else holds `key`, then holds it until the returned guard is dropped.
    pub async fn lock<S: Into<String>>(&self, key: S) -> KeyGuard {
        let key = key.into();
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            if locks.len() > SWEEP_THRESHOLD {
                locks.retain(|_, m| m.strong_count() > 0);
            }
            match locks.get(&key).and_then(Weak::upgrade) {
                Some(m) => m,
                None => {
                    let m = Arc::new(AsyncMutex::new(()));
                    locks.insert(key.clone(), Arc::downgrade(&m));
                    m
                },
            }
        };
        let guard = mutex.lock_owned().await;
        trace!("🔐️ Acquired lock for {key}");
        KeyGuard { key, _guard: guard }
    }

    /// The number of keys that are currently held or waited on.
    pub fn live_keys(&self) -> usize {
        let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.values().filter(|m| m.strong_count() > 0).count()
    }

    pub fn user_key<D: std::fmt::Display>(user_id: D) -> String {
        format!("user:{user_id}")
    }

    pub fn review_key<D: std::fmt::Display>(product_id: D, user_id: D) -> String {
        format!("review:{product_id}:{user_id}")
    }

    pub fn chat_key<D: std::fmt::Display>(chat_id: D) -> String {
        format!("chat:{chat_id}")
    }
}
