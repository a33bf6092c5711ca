//! # Error Types
//!
//! Shared error surface for the storage engine and the server. Kept small
//! and closed so the command layer can match exhaustively when turning a
//! store error into a wire reply.

use thiserror::Error;

/// Result alias used throughout the store and server.
pub type HkvResult<T> = Result<T, HkvError>;

/// Errors produced by the storage engine.
///
/// A missing key is reported through the return value (`Option`, `bool`,
/// `TtlStatus::Missing`), never through this enum. This stays a single
/// variant for now; it's a closed enum so the command layer can still match
/// exhaustively as more failure modes are added.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HkvError {
    /// An arithmetic command (`INCR`/`INCRBY`/`DECR`) targeted a key whose
    /// stored value is not an integer.
    #[error("value is not an integer or out of range")]
    NotInteger,
}
