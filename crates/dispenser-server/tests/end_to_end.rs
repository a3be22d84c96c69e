//! Drives the connection dispatcher over a real loopback socket, covering
//! the sequence/fixed-width basics, exhaustion, concurrent snowflake
//! uniqueness, and reconfigure-immutability scenarios.

use std::collections::HashSet;
use std::sync::Arc;

use dispenser_core::{DurabilityStrategy, NullPersistence, Registry};
use dispenser_server::connection::handle_connection;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

async fn spawn_server() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let registry = Arc::new(Registry::new(Arc::new(NullPersistence), DurabilityStrategy::default()));

    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else { break };
            let registry = registry.clone();
            tokio::spawn(handle_connection(socket, registry));
        }
    });

    addr
}

fn encode(args: &[&str]) -> Vec<u8> {
    let mut out = format!("*{}\r\n", args.len()).into_bytes();
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg.as_bytes());
        out.extend_from_slice(b"\r\n");
    }
    out
}

async fn roundtrip(stream: &mut TcpStream, args: &[&str]) -> String {
    stream.write_all(&encode(args)).await.unwrap();
    read_reply(stream).await
}

async fn read_reply(stream: &mut TcpStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut line = String::new();
    reader.read_line(&mut line).await.unwrap();
    let (tag, rest) = line.split_at(1);
    let rest = rest.trim_end();

    match tag {
        "+" | "-" | ":" => rest.to_string(),
        "$" => {
            let len: i64 = rest.parse().unwrap();
            if len < 0 {
                return "(nil)".to_string();
            }
            let mut buf = vec![0u8; len as usize + 2];
            reader.read_exact(&mut buf).await.unwrap();
            buf.truncate(len as usize);
            String::from_utf8(buf).unwrap()
        }
        other => panic!("unexpected reply tag {other:?} in {line:?}"),
    }
}

#[tokio::test]
async fn ping_pong() {
    let addr = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();
    assert_eq!(roundtrip(&mut stream, &["ping"]).await, "PONG");
}

#[tokio::test]
async fn sequence_monotonic_counts_up() {
    let addr = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    assert_eq!(
        roundtrip(&mut stream, &["hset", "seq", "type", "2", "incr_mode", "sequence", "starting", "0", "auto_disk", "memory"]).await,
        "4"
    );
    assert_eq!(roundtrip(&mut stream, &["get", "seq"]).await, "0");
    assert_eq!(roundtrip(&mut stream, &["get", "seq"]).await, "1");
    assert_eq!(roundtrip(&mut stream, &["get", "seq"]).await, "2");
}

#[tokio::test]
async fn fixed_width_exhausts_at_its_cap() {
    let addr = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    roundtrip(
        &mut stream,
        &["hset", "fw", "type", "2", "incr_mode", "fixed", "length", "1", "starting", "8", "auto_disk", "memory"],
    )
    .await;
    assert_eq!(roundtrip(&mut stream, &["get", "fw"]).await, "8");
    assert_eq!(roundtrip(&mut stream, &["get", "fw"]).await, "9");
    assert!(roundtrip(&mut stream, &["get", "fw"]).await.starts_with("exhausted"));
}

#[tokio::test]
async fn snowflake_ids_are_unique_under_concurrency() {
    let addr = spawn_server().await;
    let mut setup = TcpStream::connect(addr).await.unwrap();
    roundtrip(&mut setup, &["hset", "sf", "type", "4", "machine_id", "1", "auto_disk", "memory"]).await;

    let mut handles = Vec::new();
    for _ in 0..8 {
        handles.push(tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            let mut ids = Vec::new();
            for _ in 0..25 {
                ids.push(roundtrip(&mut stream, &["get", "sf"]).await);
            }
            ids
        }));
    }

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.await.unwrap() {
            assert!(seen.insert(id), "snowflake id collision observed");
        }
    }
    assert_eq!(seen.len(), 8 * 25);
}

#[tokio::test]
async fn reconfigure_rejects_non_durability_field_changes() {
    let addr = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    roundtrip(&mut stream, &["hset", "rw", "type", "2", "length", "8", "auto_disk", "memory"]).await;
    let reply = roundtrip(&mut stream, &["hset", "rw", "type", "2", "length", "9", "auto_disk", "memory"]).await;
    assert!(reply.starts_with("config-immutable"), "got {reply:?}");
}

#[tokio::test]
async fn del_then_unknown_dispenser_on_get() {
    let addr = spawn_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    roundtrip(&mut stream, &["hset", "gone", "type", "5"]).await;
    assert_eq!(roundtrip(&mut stream, &["del", "gone"]).await, "1");
    assert_eq!(roundtrip(&mut stream, &["del", "gone"]).await, "0");
    let reply = roundtrip(&mut stream, &["get", "gone"]).await;
    assert!(reply.starts_with("unknown-dispenser"), "got {reply:?}");
}
