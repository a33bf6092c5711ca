//! # hkv-common
//!
//! Shared error and wire-value types for the in-memory key-value server:
//! the pieces both the engine and the server (and, transitively, anything
//! embedding either) need without pulling in networking or storage code.

pub mod error;
pub mod frame;

pub use error::{HkvError, HkvResult};
pub use frame::Frame;
