//! # In-Memory Engine
//!
//! Provide the in-memory backend with sharded locking and TTL-aware
//! lookups for predictable latency.
//!
//! ## Usage
//!
//! - Use `MemoryEngine::new()` for a default sharded engine.
//! - Use `MemoryEngine::with_shard_count` to pick an explicit shard count
//!   (tests favor a small, fixed count for determinism).
//! - Use `spawn_sweeper` to enable active TTL cleanup in the background.
//!
//! ## Design Principles
//!
//! 1. **Sharded Locks**: Per-shard locks reduce contention under concurrency.
//! 2. **Arc-backed Buffers**: Values are `Arc<[u8]>` to avoid extra copies.
//! 3. **TTL Fast Path**: Expiration is checked on access for O(1) reads.
//! 4. **Strategy Pattern**: Implements `KVEngine` to keep callers decoupled.
//!
//! ## Structure Overview
//!
//! ```text
//! MemoryEngine
//!   └── shards: Vec<Shard>
//!         └── Shard
//!               └── inner: RwLock<ShardInner>
//!                     └── map: HashMap<Arc<[u8]>, Entry>
//!                           └── Entry { value: StoredValue, expires_at }
//! ```

use std::hash::{BuildHasher, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ahash::RandomState;
use hashbrown::HashMap;
use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use hkv_common::{HkvError, HkvResult};

use crate::engine::{
    ExpireCondition, ExpireOptions, KVEngine, PttlStatus, SetOptions, TtlStatus, WriteCondition,
};
use crate::value::StoredValue;

/// Default shards = CPU count * multiplier to reduce lock contention.
const DEFAULT_SHARD_MULTIPLIER: usize = 4;

/// A single stored entry: its value and, if any, its absolute deadline.
#[derive(Debug, Clone)]
struct Entry {
    value: StoredValue,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if now >= deadline)
    }
}

/// Per-shard storage container for the in-memory engine.
///
/// The map key is `Arc<[u8]>` so the key buffer is shared rather than
/// copied on every insert, and `expires_at` lives next to the value so a
/// single shard lock keeps both consistent.
#[derive(Debug)]
struct ShardInner {
    map: HashMap<Arc<[u8]>, Entry, RandomState>,
}

impl ShardInner {
    fn new(hash_state: RandomState) -> Self {
        ShardInner {
            map: HashMap::with_hasher(hash_state),
        }
    }

    /// Removes `key` if it is present and expired as of `now`.
    fn evict_if_expired(&mut self, key: &[u8], now: Instant) {
        if let Some(entry) = self.map.get(key) {
            if entry.is_expired(now) {
                self.map.remove(key);
            }
        }
    }
}

/// Per-shard lock wrapper. Keeps locking scoped to one shard at a time.
#[derive(Debug)]
struct Shard {
    inner: RwLock<ShardInner>,
}

/// Sharded in-memory implementation of `KVEngine`.
///
/// Eviction is driven only by explicit deletion and TTL expiry (lazy, on
/// access, plus the background sweeper). No LRU/LFU capacity eviction.
#[derive(Debug)]
pub struct MemoryEngine {
    shards: Vec<Shard>,
    shard_mask: usize,
    hash_state: RandomState,
}

/// Handle for the background expiration sweeper.
///
/// Dropping this handle does not stop the sweeper; call `stop` for a clean
/// shutdown.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals shutdown and waits for the sweeper task to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryEngine {
    /// Creates a new engine with a default shard count based on CPU
    /// parallelism.
    pub fn new() -> Self {
        let threads = std::thread::available_parallelism()
            .map(|count| count.get())
            .unwrap_or(1);
        Self::with_shard_count(threads.saturating_mul(DEFAULT_SHARD_MULTIPLIER))
    }

    /// Creates a new engine with a caller-provided shard count, normalized
    /// to the next power of two to enable fast masking.
    pub fn with_shard_count(shards: usize) -> Self {
        let shard_count = normalize_shard_count(shards);
        let hash_state = RandomState::new();
        let mut shard_vec = Vec::with_capacity(shard_count);
        for _ in 0..shard_count {
            shard_vec.push(Shard {
                inner: RwLock::new(ShardInner::new(hash_state.clone())),
            });
        }

        MemoryEngine {
            shards: shard_vec,
            shard_mask: shard_count - 1,
            hash_state,
        }
    }

    /// Removes elapsed entries across all shards using a snapshot →
    /// release → reacquire protocol: collect candidates under a read
    /// lock, drop it, then take the write lock and delete only the
    /// candidates still expired at that point, so a concurrent `SET` or
    /// `PERSIST` racing the sweeper is never clobbered.
    ///
    /// Returns the number of entries removed.
    pub fn sweep_once(&self, now: Instant) -> usize {
        let mut removed = 0;
        for shard in &self.shards {
            let candidates: Vec<Arc<[u8]>> = {
                let inner = shard.inner.read();
                inner
                    .map
                    .iter()
                    .filter(|(_, entry)| entry.is_expired(now))
                    .map(|(key, _)| Arc::clone(key))
                    .collect()
            };

            if candidates.is_empty() {
                continue;
            }

            let mut inner = shard.inner.write();
            for key in candidates {
                if let Some(entry) = inner.map.get(&key) {
                    if entry.is_expired(now) {
                        inner.map.remove(&key);
                        removed += 1;
                    }
                }
            }
        }
        removed
    }

    /// Spawns a tokio task that calls `sweep_once` on a fixed cadence
    /// until told to shut down via the returned handle.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> SweeperHandle {
        let interval = if interval.is_zero() {
            Duration::from_millis(1)
        } else {
            interval
        };

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let engine = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = engine.sweep_once(Instant::now());
                        if removed > 0 {
                            tracing::trace!(removed, "expiry sweep removed entries");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        SweeperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    fn shard_index(&self, key: &[u8]) -> usize {
        let mut hasher = self.hash_state.build_hasher();
        hasher.write(key);
        (hasher.finish() as usize) & self.shard_mask
    }

    fn shard_for(&self, key: &[u8]) -> &Shard {
        &self.shards[self.shard_index(key)]
    }
}

impl KVEngine for MemoryEngine {
    fn get(&self, key: &[u8]) -> HkvResult<Option<StoredValue>> {
        let shard = self.shard_for(key);
        let now = Instant::now();
        let mut inner = shard.inner.write();
        inner.evict_if_expired(key, now);
        Ok(inner.map.get(key).map(|entry| entry.value.clone()))
    }

    fn set(&self, key: Vec<u8>, value: Vec<u8>, options: SetOptions) -> HkvResult<bool> {
        let shard = self.shard_for(&key);
        let now = Instant::now();
        let mut inner = shard.inner.write();
        inner.evict_if_expired(&key, now);

        let exists = inner.map.contains_key(key.as_slice());
        match options.condition {
            Some(WriteCondition::IfExists) if !exists => return Ok(false),
            Some(WriteCondition::IfAbsent) if exists => return Ok(false),
            _ => {}
        }

        let key_arc: Arc<[u8]> = Arc::from(key);
        let entry = Entry {
            value: StoredValue::from_bytes(value),
            expires_at: options.ttl.map(|ttl| now + ttl),
        };
        inner.map.insert(key_arc, entry);
        Ok(true)
    }

    fn delete(&self, key: &[u8]) -> HkvResult<bool> {
        let shard = self.shard_for(key);
        let now = Instant::now();
        let mut inner = shard.inner.write();
        inner.evict_if_expired(key, now);
        Ok(inner.map.remove(key).is_some())
    }

    fn expire(&self, key: &[u8], seconds: i64, options: ExpireOptions) -> HkvResult<bool> {
        let shard = self.shard_for(key);
        let now = Instant::now();
        let mut inner = shard.inner.write();
        inner.evict_if_expired(key, now);

        if seconds <= 0 {
            // XX/NX are still evaluated against the current expiry state
            // even though the outcome here is deletion, not a TTL update.
            let has_expiry = inner
                .map
                .get(key)
                .is_some_and(|entry| entry.expires_at.is_some());
            match options.condition {
                Some(ExpireCondition::IfHasExpiry) if !has_expiry => return Ok(false),
                Some(ExpireCondition::IfNoExpiry) if has_expiry => return Ok(false),
                _ => {}
            }
            return Ok(inner.map.remove(key).is_some());
        }

        let entry = match inner.map.get_mut(key) {
            Some(entry) => entry,
            None => return Ok(false),
        };

        let has_expiry = entry.expires_at.is_some();
        match options.condition {
            Some(ExpireCondition::IfHasExpiry) if !has_expiry => return Ok(false),
            Some(ExpireCondition::IfNoExpiry) if has_expiry => return Ok(false),
            _ => {}
        }

        entry.expires_at = Some(now + Duration::from_secs(seconds as u64));
        Ok(true)
    }

    fn persist(&self, key: &[u8]) -> HkvResult<bool> {
        let shard = self.shard_for(key);
        let now = Instant::now();
        let mut inner = shard.inner.write();
        inner.evict_if_expired(key, now);

        match inner.map.get_mut(key) {
            Some(entry) if entry.expires_at.is_some() => {
                entry.expires_at = None;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn ttl(&self, key: &[u8]) -> HkvResult<TtlStatus> {
        match self.pttl(key)? {
            PttlStatus::Missing => Ok(TtlStatus::Missing),
            PttlStatus::NoExpiry => Ok(TtlStatus::NoExpiry),
            PttlStatus::ExpiresIn(remaining) => {
                let millis = remaining.as_millis();
                let seconds = (millis + 500) / 1000;
                Ok(TtlStatus::ExpiresIn(Duration::from_secs(seconds as u64)))
            }
        }
    }

    fn pttl(&self, key: &[u8]) -> HkvResult<PttlStatus> {
        let shard = self.shard_for(key);
        let now = Instant::now();
        let mut inner = shard.inner.write();
        inner.evict_if_expired(key, now);

        let entry = match inner.map.get(key) {
            Some(entry) => entry,
            None => return Ok(PttlStatus::Missing),
        };

        match entry.expires_at {
            None => Ok(PttlStatus::NoExpiry),
            Some(deadline) if deadline <= now => {
                inner.map.remove(key);
                Ok(PttlStatus::Missing)
            }
            Some(deadline) => Ok(PttlStatus::ExpiresIn(deadline - now)),
        }
    }

    fn incr_by(&self, key: &[u8], delta: i64) -> HkvResult<i64> {
        let shard = self.shard_for(key);
        let now = Instant::now();
        let mut inner = shard.inner.write();
        inner.evict_if_expired(key, now);

        match inner.map.get_mut(key) {
            Some(entry) => match entry.value.as_int() {
                Some(current) => {
                    let updated = current.wrapping_add(delta);
                    entry.value = StoredValue::Int(updated);
                    Ok(updated)
                }
                None => Err(HkvError::NotInteger),
            },
            None => {
                let key_arc: Arc<[u8]> = Arc::from(key.to_vec());
                inner.map.insert(
                    key_arc,
                    Entry {
                        value: StoredValue::Int(delta),
                        expires_at: None,
                    },
                );
                Ok(delta)
            }
        }
    }
}

/// Normalizes shard counts to a power of two for fast masking.
fn normalize_shard_count(count: usize) -> usize {
    count.max(1).next_power_of_two()
}
