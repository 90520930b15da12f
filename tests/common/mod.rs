//! Shared utilities for gateway integration tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use edge_gateway::config::GatewayConfig;
use edge_gateway::{GatewayServer, Shutdown};

/// Read from the socket until the end of the HTTP header block.
pub async fn read_head(socket: &mut TcpStream) -> Option<Vec<u8>> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = socket.read(&mut buf).await.ok()?;
        if n == 0 {
            return if head.is_empty() { None } else { Some(head) };
        }
        head.extend_from_slice(&buf[..n]);
        if head.windows(4).any(|w| w == b"\r\n\r\n") {
            return Some(head);
        }
    }
}

fn request_path(head: &[u8]) -> String {
    let text = String::from_utf8_lossy(head);
    text.lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("")
        .to_string()
}

/// Start a mock backend that answers every request with its own request
/// path (and query) as the body. Connections are closed after one exchange.
pub async fn start_path_echo_backend(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        if let Some(head) = read_head(&mut socket).await {
                            let path = request_path(&head);
                            let response = format!(
                                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                                path.len(),
                                path
                            );
                            let _ = socket.write_all(response.as_bytes()).await;
                            let _ = socket.shutdown().await;
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Start a keep-alive mock backend that counts accepted TCP connections.
/// Used to observe upstream connection reuse.
pub async fn start_counting_backend(addr: SocketAddr) -> Arc<AtomicU32> {
    let listener = TcpListener::bind(addr).await.unwrap();
    let connections = Arc::new(AtomicU32::new(0));
    let counter = connections.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(async move {
                        // Serve any number of requests on this connection.
                        while read_head(&mut socket).await.is_some() {
                            let response =
                                "HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok";
                            if socket.write_all(response.as_bytes()).await.is_err() {
                                break;
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    connections
}

/// Start a mock backend that accepts a WebSocket handshake and then echoes
/// every byte it receives.
pub async fn start_ws_echo_backend(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        if read_head(&mut socket).await.is_none() {
                            return;
                        }
                        let handshake = "HTTP/1.1 101 Switching Protocols\r\n\
                                         Upgrade: websocket\r\n\
                                         Connection: Upgrade\r\n\r\n";
                        if socket.write_all(handshake.as_bytes()).await.is_err() {
                            return;
                        }
                        let mut buf = [0u8; 1024];
                        loop {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => {
                                    if socket.write_all(&buf[..n]).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Gateway config pointing both pools at the given mock backends, with
/// metrics disabled for test isolation.
pub fn test_config(
    proxy: SocketAddr,
    dashboard: SocketAddr,
    detection: SocketAddr,
) -> GatewayConfig {
    let mut config = GatewayConfig::standard();
    config.listener.bind_address = proxy.to_string();
    config.observability.metrics_enabled = false;
    for pool in &mut config.pools {
        pool.addresses = match pool.name.as_str() {
            "detection" => vec![detection.to_string()],
            _ => vec![dashboard.to_string()],
        };
    }
    config
}

/// Spawn the gateway on its configured address; returns the shutdown handle
/// keeping it alive.
pub async fn spawn_gateway(config: GatewayConfig) -> Shutdown {
    let addr = config.listener.bind_address.clone();
    let listener = TcpListener::bind(&addr).await.unwrap();
    let server = GatewayServer::new(config);
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.clone();

    tokio::spawn(async move {
        let _ = server.run(listener, &server_shutdown).await;
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    shutdown
}

/// Plain client without connection pooling toward the gateway, mirroring
/// independent clients.
pub fn fresh_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
