//! # hkv-engine
//!
//! The in-memory storage backend: a sharded, lock-based key-value map with
//! lazy and background TTL expiry. Exposed behind the `KVEngine` trait so
//! the server never depends on the concrete storage strategy.

pub mod engine;
pub mod memory;
pub mod value;

pub use engine::{
    ExpireCondition, ExpireOptions, KVEngine, PttlStatus, SetOptions, SharedEngine, TtlStatus,
    WriteCondition,
};
pub use memory::{MemoryEngine, SweeperHandle};
pub use value::StoredValue;
