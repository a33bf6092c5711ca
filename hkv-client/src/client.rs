//! # Synchronous Client API
//!
//! Purpose: Expose a compact, blocking API for issuing commands to the
//! key-value server over the RESP2-style wire protocol.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `KVClient` hides pooling and protocol details.
//! 2. **Borrow-Friendly API**: Accept `&[u8]` to avoid unnecessary copies.
//! 3. **Fail Fast**: Protocol violations surface immediately as errors.
//! 4. **Performance First**: Prefer direct TCP writes and buffer reuse.

use std::fmt;
use std::time::Duration;

use crate::pool::{ConnectionPool, PoolConfig};
use crate::resp::RespValue;

/// Result type for the sync client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the sync client.
#[derive(Debug)]
pub enum ClientError {
    /// Network or IO failure while reading/writing.
    Io(std::io::Error),
    /// RESP2 framing or parse error.
    Protocol,
    /// Server returned an error reply.
    Server { message: Vec<u8> },
    /// Response type did not match the expected command response.
    UnexpectedResponse,
    /// Pool is at capacity and no idle connections are available.
    PoolExhausted,
    /// Address could not be parsed into a socket address.
    InvalidAddress,
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Io(err) => write!(f, "io error: {}", err),
            ClientError::Protocol => write!(f, "protocol error"),
            ClientError::Server { message } => {
                write!(f, "server error: {}", String::from_utf8_lossy(message))
            }
            ClientError::UnexpectedResponse => write!(f, "unexpected response"),
            ClientError::PoolExhausted => write!(f, "connection pool exhausted"),
            ClientError::InvalidAddress => write!(f, "invalid address"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::Io(err)
    }
}

/// TTL state returned by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientTtl {
    /// Key is missing or already expired.
    Missing,
    /// Key exists without expiration.
    NoExpiry,
    /// Key expires after the provided duration.
    ExpiresIn(Duration),
}

/// A conditional-write flag for `SET`/`EXPIRE`. Mirrors the server's
/// `XX`/`NX` option tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCondition {
    /// Only apply if the key (or its TTL, for `EXPIRE`) already exists.
    IfExists,
    /// Only apply if the key (or its TTL, for `EXPIRE`) is absent.
    IfAbsent,
}

impl WriteCondition {
    fn as_token(self) -> &'static [u8] {
        match self {
            WriteCondition::IfExists => b"XX",
            WriteCondition::IfAbsent => b"NX",
        }
    }
}

/// Configuration for the synchronous client and its pool.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server address, e.g. "127.0.0.1:6379".
    pub addr: String,
    /// Maximum idle connections kept in the pool.
    pub max_idle: usize,
    /// Maximum total connections (idle + in-use).
    pub max_total: usize,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            addr: "127.0.0.1:6379".to_string(),
            max_idle: 8,
            max_total: 16,
            read_timeout: None,
            write_timeout: None,
            connect_timeout: None,
        }
    }
}

/// Synchronous client with connection pooling.
///
/// This is a facade over the pool and RESP encoder/decoder. Each call
/// acquires a connection, executes one command, and returns the connection
/// to the pool.
pub struct KVClient {
    pool: ConnectionPool,
}

impl KVClient {
    /// Creates a client with default configuration.
    pub fn connect(addr: impl Into<String>) -> ClientResult<Self> {
        let mut config = ClientConfig::default();
        config.addr = addr.into();
        Self::with_config(config)
    }

    /// Creates a client with a custom configuration.
    pub fn with_config(config: ClientConfig) -> ClientResult<Self> {
        let pool = ConnectionPool::new(PoolConfig {
            addr: config.addr,
            max_idle: config.max_idle,
            max_total: config.max_total,
            read_timeout: config.read_timeout,
            write_timeout: config.write_timeout,
            connect_timeout: config.connect_timeout,
        })?;
        Ok(KVClient { pool })
    }

    /// Fetches a value by key.
    ///
    /// Returns `Ok(None)` when the key is missing. Integer-typed values
    /// come back as their decimal text, matching what `SET` was given.
    pub fn get(&self, key: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        let mut conn = self.pool.acquire()?;
        match conn.exec(&[b"GET", key])? {
            RespValue::Bulk(data) => Ok(data),
            RespValue::Integer(value) => Ok(Some(value.to_string().into_bytes())),
            RespValue::Error(message) => Err(ClientError::Server { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Sets a value for a key without expiration, clearing any prior TTL.
    pub fn set(&self, key: &[u8], value: &[u8]) -> ClientResult<bool> {
        self.set_ex(key, value, None, None)
    }

    /// Sets a value and attaches an expiration in seconds.
    pub fn set_with_ttl(&self, key: &[u8], value: &[u8], ttl: Duration) -> ClientResult<bool> {
        self.set_ex(key, value, Some(ttl), None)
    }

    /// Sets a value with an optional TTL and an optional `XX`/`NX` condition.
    ///
    /// Returns `false` when a condition prevented the write (nothing is
    /// sent to the store in that case).
    pub fn set_ex(
        &self,
        key: &[u8],
        value: &[u8],
        ttl: Option<Duration>,
        condition: Option<WriteCondition>,
    ) -> ClientResult<bool> {
        let mut args: Vec<&[u8]> = vec![b"SET", key, value];
        let (seconds, len) = ttl.map(|ttl| encode_u64(ttl.as_secs())).unwrap_or(([0u8; 20], 0));
        if ttl.is_some() {
            args.push(b"EX");
            args.push(&seconds[..len]);
        }
        if let Some(condition) = condition {
            args.push(condition.as_token());
        }

        let mut conn = self.pool.acquire()?;
        match conn.exec(&args)? {
            RespValue::Simple(_) => Ok(true),
            RespValue::Bulk(None) => Ok(false),
            RespValue::Error(message) => Err(ClientError::Server { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Deletes a key. Returns true when a key was removed.
    pub fn delete(&self, key: &[u8]) -> ClientResult<bool> {
        let mut conn = self.pool.acquire()?;
        match conn.exec(&[b"DEL", key])? {
            RespValue::Integer(count) => Ok(count > 0),
            RespValue::Error(message) => Err(ClientError::Server { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Sets a time-to-live on a key. Returns true when the TTL was set or
    /// the key deleted (`seconds <= 0`).
    pub fn expire(&self, key: &[u8], ttl: Duration) -> ClientResult<bool> {
        self.expire_ex(key, ttl.as_secs() as i64, None)
    }

    /// `EXPIRE` with an explicit second count (accepts non-positive values,
    /// which delete the key) and an optional `XX`/`NX` condition.
    pub fn expire_ex(
        &self,
        key: &[u8],
        seconds: i64,
        condition: Option<WriteCondition>,
    ) -> ClientResult<bool> {
        let mut buf = Vec::new();
        write_i64(seconds, &mut buf);
        let mut args: Vec<&[u8]> = vec![b"EXPIRE", key, &buf];
        if let Some(condition) = condition {
            args.push(condition.as_token());
        }

        let mut conn = self.pool.acquire()?;
        match conn.exec(&args)? {
            RespValue::Integer(value) => Ok(value == 1),
            RespValue::Error(message) => Err(ClientError::Server { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Removes the TTL on a key. Returns true iff one was removed.
    pub fn persist(&self, key: &[u8]) -> ClientResult<bool> {
        let mut conn = self.pool.acquire()?;
        match conn.exec(&[b"PERSIST", key])? {
            RespValue::Integer(value) => Ok(value == 1),
            RespValue::Error(message) => Err(ClientError::Server { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Returns TTL status for a key, in seconds.
    pub fn ttl(&self, key: &[u8]) -> ClientResult<ClientTtl> {
        let mut conn = self.pool.acquire()?;
        match conn.exec(&[b"TTL", key])? {
            RespValue::Integer(value) if value == -2 => Ok(ClientTtl::Missing),
            RespValue::Integer(value) if value == -1 => Ok(ClientTtl::NoExpiry),
            RespValue::Integer(value) if value >= 0 => {
                Ok(ClientTtl::ExpiresIn(Duration::from_secs(value as u64)))
            }
            RespValue::Error(message) => Err(ClientError::Server { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Returns TTL status for a key, in milliseconds.
    pub fn pttl(&self, key: &[u8]) -> ClientResult<ClientTtl> {
        let mut conn = self.pool.acquire()?;
        match conn.exec(&[b"PTTL", key])? {
            RespValue::Integer(value) if value == -2 => Ok(ClientTtl::Missing),
            RespValue::Integer(value) if value == -1 => Ok(ClientTtl::NoExpiry),
            RespValue::Integer(value) if value >= 0 => {
                Ok(ClientTtl::ExpiresIn(Duration::from_millis(value as u64)))
            }
            RespValue::Error(message) => Err(ClientError::Server { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Increments a key by one, creating it with value 1 if absent.
    pub fn incr(&self, key: &[u8]) -> ClientResult<i64> {
        self.incr_by(key, 1)
    }

    /// Increments a key by `delta`, creating it with value `delta` if
    /// absent.
    pub fn incr_by(&self, key: &[u8], delta: i64) -> ClientResult<i64> {
        let mut buf = Vec::new();
        write_i64(delta, &mut buf);
        let mut conn = self.pool.acquire()?;
        match conn.exec(&[b"INCRBY", key, &buf])? {
            RespValue::Integer(value) => Ok(value),
            RespValue::Error(message) => Err(ClientError::Server { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Decrements a key by one, creating it with value -1 if absent.
    pub fn decr(&self, key: &[u8]) -> ClientResult<i64> {
        let mut conn = self.pool.acquire()?;
        match conn.exec(&[b"DECR", key])? {
            RespValue::Integer(value) => Ok(value),
            RespValue::Error(message) => Err(ClientError::Server { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Pings the server. Returns the raw response payload.
    pub fn ping(&self, payload: Option<&[u8]>) -> ClientResult<Vec<u8>> {
        let mut conn = self.pool.acquire()?;
        let response = match payload {
            Some(data) => conn.exec(&[b"PING", data])?,
            None => conn.exec(&[b"PING"])?,
        };
        match response {
            RespValue::Simple(text) => Ok(text),
            RespValue::Bulk(Some(data)) => Ok(data),
            RespValue::Error(message) => Err(ClientError::Server { message }),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }
}

fn encode_u64(mut value: u64) -> ([u8; 20], usize) {
    let mut buf = [0u8; 20];
    let mut len = 0;
    if value == 0 {
        buf[0] = b'0';
        return (buf, 1);
    }
    while value > 0 {
        buf[len] = b'0' + (value % 10) as u8;
        value /= 10;
        len += 1;
    }
    buf[..len].reverse();
    (buf, len)
}

fn write_i64(value: i64, out: &mut Vec<u8>) {
    if value < 0 {
        out.push(b'-');
        let (digits, len) = encode_u64(value.unsigned_abs());
        out.extend_from_slice(&digits[..len]);
    } else {
        let (digits, len) = encode_u64(value as u64);
        out.extend_from_slice(&digits[..len]);
    }
}
