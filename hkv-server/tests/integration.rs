//! End-to-end tests driving a real `TcpListener` through `hkv-client`,
//! covering the concrete scenarios from spec.md §8.

use std::sync::Arc;
use std::time::Duration;

use hkv_client::{ClientTtl, KVClient, WriteCondition};
use hkv_server::{NoopObserver, Server, ServerConfig};

async fn spawn() -> (Server, String) {
    let mut config = ServerConfig::default();
    config.bind_addr = "127.0.0.1:0".to_string();
    let server = Server::bind(config, Arc::new(NoopObserver)).await.expect("bind");
    let addr = server.local_addr().to_string();
    (server, addr)
}

#[tokio::test]
async fn scenario_set_get_del_get() {
    let (server, addr) = spawn().await;
    tokio::task::spawn_blocking(move || {
        let client = KVClient::connect(addr).expect("connect");
        assert!(client.set(b"k", b"foo").expect("set"));
        assert_eq!(client.get(b"k").expect("get"), Some(b"foo".to_vec()));
        assert!(client.delete(b"k").expect("del"));
        assert_eq!(client.get(b"k").expect("get"), None);
    })
    .await
    .expect("join");
    server.shutdown().await;
}

#[tokio::test]
async fn scenario_set_with_ex_then_ttl_then_incr() {
    let (server, addr) = spawn().await;
    tokio::task::spawn_blocking(move || {
        let client = KVClient::connect(addr).expect("connect");
        assert!(client
            .set_ex(b"n", b"42", Some(Duration::from_secs(10)), None)
            .expect("set"));
        match client.ttl(b"n").expect("ttl") {
            ClientTtl::ExpiresIn(remaining) => {
                assert!(remaining <= Duration::from_secs(10) && remaining >= Duration::from_secs(9));
            }
            other => panic!("expected ExpiresIn, got {:?}", other),
        }
        assert_eq!(client.incr(b"n").expect("incr"), 43);
    })
    .await
    .expect("join");
    server.shutdown().await;
}

#[tokio::test]
async fn scenario_set_nx_rejects_second_write() {
    let (server, addr) = spawn().await;
    tokio::task::spawn_blocking(move || {
        let client = KVClient::connect(addr).expect("connect");
        assert!(client
            .set_ex(b"k", b"v", None, Some(WriteCondition::IfAbsent))
            .expect("first set"));
        assert!(!client
            .set_ex(b"k", b"v", None, Some(WriteCondition::IfAbsent))
            .expect("second set"));
    })
    .await
    .expect("join");
    server.shutdown().await;
}

#[tokio::test]
async fn scenario_expire_zero_deletes_existing_key() {
    let (server, addr) = spawn().await;
    tokio::task::spawn_blocking(move || {
        let client = KVClient::connect(addr).expect("connect");
        client.set(b"k", b"v").expect("set");
        assert!(client.expire_ex(b"k", 0, None).expect("expire"));
        assert_eq!(client.get(b"k").expect("get"), None);
    })
    .await
    .expect("join");
    server.shutdown().await;
}

#[tokio::test]
async fn scenario_incr_decr_sequence() {
    let (server, addr) = spawn().await;
    tokio::task::spawn_blocking(move || {
        let client = KVClient::connect(addr).expect("connect");
        assert_eq!(client.incr(b"c").expect("incr"), 1);
        assert_eq!(client.incr(b"c").expect("incr"), 2);
        assert_eq!(client.incr_by(b"c", 10).expect("incr_by"), 12);
        assert_eq!(client.decr(b"c").expect("decr"), 11);
    })
    .await
    .expect("join");
    server.shutdown().await;
}

#[tokio::test]
async fn scenario_pipelined_ping_set_get_single_segment() {
    let (server, addr) = spawn().await;
    tokio::task::spawn_blocking(move || {
        use std::io::{Read, Write};
        use std::net::TcpStream;

        let mut stream = TcpStream::connect(&addr).expect("connect");
        stream
            .write_all(b"*1\r\n$4\r\nPING\r\n*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n*2\r\n$3\r\nGET\r\n$1\r\nk\r\n")
            .expect("write");

        let mut buf = vec![0u8; 256];
        let mut total = Vec::new();
        // Expect: +PONG\r\n +OK\r\n $1\r\nv\r\n
        while total.len() < b"+PONG\r\n+OK\r\n$1\r\nv\r\n".len() {
            let read = stream.read(&mut buf).expect("read");
            assert!(read > 0);
            total.extend_from_slice(&buf[..read]);
        }
        assert_eq!(total, b"+PONG\r\n+OK\r\n$1\r\nv\r\n");
    })
    .await
    .expect("join");
    server.shutdown().await;
}

#[tokio::test]
async fn scenario_persist_is_idempotent() {
    let (server, addr) = spawn().await;
    tokio::task::spawn_blocking(move || {
        let client = KVClient::connect(addr).expect("connect");
        client
            .set_ex(b"k", b"v", Some(Duration::from_secs(30)), None)
            .expect("set");
        assert!(client.persist(b"k").expect("first persist"));
        assert!(!client.persist(b"k").expect("second persist"));
    })
    .await
    .expect("join");
    server.shutdown().await;
}

#[tokio::test]
async fn scenario_incr_type_mismatch() {
    let (server, addr) = spawn().await;
    tokio::task::spawn_blocking(move || {
        let client = KVClient::connect(addr).expect("connect");
        client.set(b"k", b"10abc").expect("set");
        let err = client.incr(b"k").expect_err("incr on non-integer should fail");
        match err {
            hkv_client::ClientError::Server { message } => {
                assert!(String::from_utf8_lossy(&message).contains("not an integer"));
            }
            other => panic!("expected server error, got {:?}", other),
        }
    })
    .await
    .expect("join");
    server.shutdown().await;
}
