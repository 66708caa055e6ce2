//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use frame_relay::config::ServerConfig;
use frame_relay::relay::{ConnectionTracker, RoomRegistry};
use frame_relay::{HttpServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Request heads received by a mock upstream, oldest first.
pub type Seen = Arc<Mutex<Vec<String>>>;

/// Build a raw HTTP/1.1 response.
#[allow(dead_code)]
pub fn http_response(status: &str, headers: &[(&str, &str)], body: &[u8]) -> Vec<u8> {
    let mut head = format!("HTTP/1.1 {status}\r\n");
    for (name, value) in headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    head.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    ));
    let mut out = head.into_bytes();
    out.extend_from_slice(body);
    out
}

/// Start a mock upstream that answers every request with `response`.
#[allow(dead_code)]
pub async fn start_upstream(response: Vec<u8>) -> (SocketAddr, Seen) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen: Seen = Arc::default();
    let response = Arc::new(response);

    let log = Arc::clone(&seen);
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let response = Arc::clone(&response);
                    let log = Arc::clone(&log);
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        log.lock().unwrap().push(head);
                        let _ = socket.write_all(&response).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    (addr, seen)
}

async fn read_head(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// An address nothing listens on.
#[allow(dead_code)]
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Config suited to tests: no static files, no env proxies, no pings.
pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.static_files.enabled = false;
    config.fetch.use_env_proxy = false;
    config.fetch.timeout_secs = 5;
    config.relay.ping_interval_secs = 0;
    config
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub registry: Arc<RoomRegistry>,
    #[allow(dead_code)]
    pub connections: ConnectionTracker,
}

/// Run an `HttpServer` on an ephemeral port.
pub async fn start_server(config: ServerConfig) -> TestServer {
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config, shutdown.clone()).unwrap();
    let registry = server.registry();
    let connections = server.connections();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    TestServer {
        addr,
        shutdown,
        registry,
        connections,
    }
}

/// Poll `check` until it holds or two seconds pass.
#[allow(dead_code)]
pub async fn eventually<F: Fn() -> bool>(check: F) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
