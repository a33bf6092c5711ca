//! # Key-Value Sync Client
//!
//! Provide a lightweight, synchronous, dependency-free client for the
//! in-memory key-value server, with connection pooling to minimize TCP
//! handshake overhead.

mod client;
mod pool;
mod resp;

pub use client::{ClientConfig, ClientError, ClientResult, ClientTtl, KVClient, WriteCondition};
