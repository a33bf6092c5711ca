//! # Server Configuration
//!
//! CLI argument handling stays a thin external collaborator: this struct
//! only holds resolved values, the `clap` derive in `src/bin/server.rs`
//! fills them in from flags or defaults.

use std::time::Duration;

use clap::Parser;

/// Resolved runtime configuration for one server instance.
#[derive(Debug, Clone, Parser)]
#[command(name = "hkv-server", about = "In-memory key-value server")]
pub struct ServerConfig {
    /// Address to bind the TCP listener to.
    #[arg(long, default_value = "127.0.0.1:6379")]
    pub bind_addr: String,

    /// Maximum accepted bulk-string length, in bytes.
    #[arg(long, default_value_t = crate::protocol::DEFAULT_MAX_BULK_LEN)]
    pub max_bulk_len: i64,

    /// Background expiry sweep interval, in seconds.
    #[arg(long, default_value_t = 60)]
    pub sweep_interval_secs: u64,

    /// Shard count for the storage engine. Normalized to a power of two.
    /// Defaults to CPU parallelism times four when unset.
    #[arg(long)]
    pub shards: Option<usize>,
}

impl ServerConfig {
    /// The sweep interval as a `Duration`.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: "127.0.0.1:6379".to_string(),
            max_bulk_len: crate::protocol::DEFAULT_MAX_BULK_LEN,
            sweep_interval_secs: 60,
            shards: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:6379");
        assert_eq!(config.sweep_interval(), Duration::from_secs(60));
    }
}
