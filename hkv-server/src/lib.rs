//! # hkv-server
//!
//! Wires the wire codec, the command layer, and the storage engine into a
//! Tokio-based TCP server: the connection dispatcher described in
//! spec.md's component design.

pub mod commands;
pub mod config;
pub mod observer;
pub mod protocol;
pub mod server;

pub use config::ServerConfig;
pub use observer::{NoopObserver, Observer};
pub use protocol::{RespError, RespParser};
pub use server::Server;
