//! # TCP Server
//!
//! Accept connections, parse commands via the wire codec, and dispatch
//! them to the storage engine with minimal overhead. One lightweight task
//! per connection; the store is the only shared mutable resource.

use std::sync::Arc;
use std::time::Instant;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use hkv_common::Frame;
use hkv_engine::{KVEngine, MemoryEngine, SharedEngine};

use crate::commands;
use crate::config::ServerConfig;
use crate::observer::Observer;
use crate::protocol::{RespError, RespParser};

/// A running server instance: the accept loop task, the sweeper, and the
/// shutdown signal that stops both.
pub struct Server {
    shutdown: watch::Sender<bool>,
    accept_task: JoinHandle<()>,
    sweeper: hkv_engine::SweeperHandle,
    local_addr: std::net::SocketAddr,
}

impl Server {
    /// Binds the listener and spawns the accept loop and sweeper.
    ///
    /// Returns once the listener is bound and ready to accept; the accept
    /// loop itself runs on a spawned task.
    pub async fn bind(config: ServerConfig, observer: Arc<dyn Observer>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(&config.bind_addr).await?;
        let local_addr = listener.local_addr()?;

        let memory_engine = Arc::new(match config.shards {
            Some(shards) => MemoryEngine::with_shard_count(shards),
            None => MemoryEngine::new(),
        });
        let sweeper = memory_engine.spawn_sweeper(config.sweep_interval());
        let engine: SharedEngine = memory_engine;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let accept_task = tokio::spawn(accept_loop(
            listener,
            engine,
            observer,
            config.max_bulk_len,
            shutdown_rx,
        ));

        Ok(Server {
            shutdown: shutdown_tx,
            accept_task,
            sweeper,
            local_addr,
        })
    }

    /// The address the listener actually bound to (useful when the
    /// configured port was 0).
    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }

    /// Signals shutdown, closes the listener, joins the accept loop, and
    /// stops the sweeper.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.accept_task.await;
        self.sweeper.stop().await;
    }
}

async fn accept_loop(
    listener: TcpListener,
    engine: SharedEngine,
    observer: Arc<dyn Observer>,
    max_bulk_len: i64,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _peer) = match accepted {
                    Ok(pair) => pair,
                    Err(err) => {
                        tracing::warn!(error = %err, "accept failed");
                        continue;
                    }
                };

                let engine = Arc::clone(&engine);
                let observer = Arc::clone(&observer);
                tokio::spawn(async move {
                    observer.on_connection_open();
                    if let Err(err) = handle_connection(stream, engine.as_ref(), observer.as_ref(), max_bulk_len).await {
                        tracing::debug!(error = %err, "connection closed with error");
                    }
                    observer.on_connection_close();
                });
            }
            _ = shutdown_rx.changed() => {
                if *shutdown_rx.borrow() {
                    tracing::info!("accept loop shutting down");
                    return;
                }
            }
        }
    }
}

/// Handles a single connection's read/parse/handle/reply loop.
///
/// Commands are executed and replied to in the order received (spec.md
/// §5's per-connection ordering guarantee) because this loop never
/// interleaves two in-flight commands on the same connection.
async fn handle_connection(
    mut stream: TcpStream,
    engine: &dyn KVEngine,
    observer: &dyn Observer,
    max_bulk_len: i64,
) -> std::io::Result<()> {
    let mut buffer = BytesMut::with_capacity(8 * 1024);
    let mut parser = RespParser::with_max_bulk_len(max_bulk_len);
    let mut out = Vec::with_capacity(4 * 1024);

    loop {
        let read = stream.read_buf(&mut buffer).await?;
        if read == 0 {
            return Ok(());
        }

        loop {
            match parser.parse(&mut buffer) {
                Ok(Some(args)) => {
                    let started = Instant::now();
                    let (reply, label) = commands::dispatch(&args, engine);
                    observer.on_command(label, started.elapsed());
                    reply.write_to(&mut out);
                }
                Ok(None) => break,
                Err(err) => {
                    let reply = Frame::error(format!("ERR {}", err.message()));
                    reply.write_to(&mut out);
                    stream.write_all(&out).await?;
                    return Ok(());
                }
            }
        }

        if !out.is_empty() {
            stream.write_all(&out).await?;
            out.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NoopObserver;
    use hkv_client::KVClient;

    async fn spawn_test_server() -> (Server, String) {
        let mut config = ServerConfig::default();
        config.bind_addr = "127.0.0.1:0".to_string();
        let server = Server::bind(config, Arc::new(NoopObserver)).await.expect("bind");
        let addr = server.local_addr().to_string();
        (server, addr)
    }

    #[tokio::test]
    async fn ping_roundtrip_over_real_socket() {
        let (server, addr) = spawn_test_server().await;
        let client = tokio::task::spawn_blocking(move || {
            let client = KVClient::connect(addr).expect("connect");
            client.ping(None).expect("ping")
        })
        .await
        .expect("join");
        assert_eq!(client, b"PONG");
        server.shutdown().await;
    }

    #[tokio::test]
    async fn set_get_del_over_real_socket() {
        let (server, addr) = spawn_test_server().await;
        tokio::task::spawn_blocking(move || {
            let client = KVClient::connect(addr).expect("connect");
            client.set(b"k", b"v").expect("set");
            assert_eq!(client.get(b"k").expect("get"), Some(b"v".to_vec()));
            assert!(client.delete(b"k").expect("delete"));
            assert_eq!(client.get(b"k").expect("get"), None);
        })
        .await
        .expect("join");
        server.shutdown().await;
    }

    #[tokio::test]
    async fn pipelined_commands_reply_in_order() {
        let (server, addr) = spawn_test_server().await;
        tokio::task::spawn_blocking(move || {
            let client = KVClient::connect(addr).expect("connect");
            assert_eq!(client.ping(None).expect("ping"), b"PONG");
            client.set(b"k", b"v").expect("set");
            assert_eq!(client.get(b"k").expect("get"), Some(b"v".to_vec()));
        })
        .await
        .expect("join");
        server.shutdown().await;
    }
}
