//! # Storage Engine Interface
//!
//! ## Design Principles
//!
//! 1. **Strategy Pattern**: Abstract the engine behind a trait so different
//!    implementations can be swapped without touching the caller.
//! 2. **Binary-Safe API**: Keys/values are byte buffers to match Redis semantics.
//! 3. **Zero-Cost Dispatch**: When used with generics, calls monomorphize to
//!    avoid dynamic dispatch overhead.
//! 4. **Explicit TTL**: Expose expiration via a dedicated method to keep the
//!    hot read path minimal.

use std::sync::Arc;
use std::time::Duration;

use hkv_common::HkvResult;

use crate::value::StoredValue;

/// TTL query result, in whole seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlStatus {
    /// Key does not exist or is already expired.
    Missing,
    /// Key exists but has no expiration set.
    NoExpiry,
    /// Key expires after the given duration, rounded to the nearest second.
    ExpiresIn(Duration),
}

/// TTL query result, in whole milliseconds. Mirrors `TtlStatus` for `PTTL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PttlStatus {
    /// Key does not exist or is already expired.
    Missing,
    /// Key exists but has no expiration set.
    NoExpiry,
    /// Key expires after the given duration.
    ExpiresIn(Duration),
}

/// A write-condition flag for `SET`: mutually exclusive per spec.md §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCondition {
    /// Only write if the key already exists.
    IfExists,
    /// Only write if the key does not exist.
    IfAbsent,
}

/// Options accepted by `KVEngine::set`.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Absolute TTL to apply on success. `None` clears any prior TTL
    /// (spec.md §4.2: "If no TTL option is given ... the TTL is cleared").
    pub ttl: Option<Duration>,
    /// `XX`/`NX` condition, if any.
    pub condition: Option<WriteCondition>,
}

/// A TTL-condition flag for `EXPIRE`: mutually exclusive per spec.md §4.2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireCondition {
    /// Only update if the key already has a TTL.
    IfHasExpiry,
    /// Only set if the key has no TTL yet.
    IfNoExpiry,
}

/// Options accepted by `KVEngine::expire`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExpireOptions {
    /// `XX`/`NX` condition, if any.
    pub condition: Option<ExpireCondition>,
}

/// Strategy pattern: defines the engine behavior surface for the server.
///
/// Keys and values are treated as bulk strings (binary-safe) at the API
/// boundary; the engine classifies values into `StoredValue::Int`/`Str`
/// internally (spec.md §3), surfaced to callers through `StoredValue`.
pub trait KVEngine: Send + Sync {
    /// Returns the value for a key, or `None` if missing or expired.
    /// Lazily removes the key if its expiry has elapsed.
    fn get(&self, key: &[u8]) -> HkvResult<Option<StoredValue>>;

    /// Inserts or conditionally inserts a key with the provided value.
    ///
    /// Returns `true` if the write happened, `false` if a `XX`/`NX`
    /// condition prevented it (nothing is written in that case).
    fn set(&self, key: Vec<u8>, value: Vec<u8>, options: SetOptions) -> HkvResult<bool>;

    /// Removes a key. Returns true if the key existed and was removed.
    fn delete(&self, key: &[u8]) -> HkvResult<bool>;

    /// Updates a key's expiry. `seconds <= 0` deletes the key instead.
    ///
    /// Returns whether the expiry was set (or the key deleted); `false`
    /// when the key is absent, or an unmet `XX`/`NX` condition stopped it.
    fn expire(&self, key: &[u8], seconds: i64, options: ExpireOptions) -> HkvResult<bool>;

    /// Removes the expiry on a key, if any. Returns `true` iff one was
    /// removed.
    fn persist(&self, key: &[u8]) -> HkvResult<bool>;

    /// Returns the TTL state for a key, in seconds.
    fn ttl(&self, key: &[u8]) -> HkvResult<TtlStatus>;

    /// Returns the TTL state for a key, in milliseconds.
    fn pttl(&self, key: &[u8]) -> HkvResult<PttlStatus>;

    /// Increments a key by one, creating it with value 1 if absent.
    /// Returns `HkvError::NotInteger` if the stored value is non-integer.
    fn incr(&self, key: &[u8]) -> HkvResult<i64> {
        self.incr_by(key, 1)
    }

    /// Increments a key by `delta`, creating it with value `delta` if
    /// absent. Overflow wraps using 64-bit two's-complement arithmetic
    /// (`i64::wrapping_add`) rather than panicking or saturating.
    fn incr_by(&self, key: &[u8], delta: i64) -> HkvResult<i64>;

    /// Decrements a key by one. Equivalent to `incr_by(key, -1)` except
    /// that an absent key is created with value `-1`, not `1`.
    fn decr(&self, key: &[u8]) -> HkvResult<i64> {
        self.incr_by(key, -1)
    }
}

/// Convenience so callers holding `Arc<dyn KVEngine>` can pass it around
/// without repeating the trait object type.
pub type SharedEngine = Arc<dyn KVEngine>;
