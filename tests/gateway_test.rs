//! End-to-end gateway behavior tests against mock backends.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

mod common;

#[tokio::test]
async fn routing_and_rewrite() {
    let dashboard: SocketAddr = "127.0.0.1:29101".parse().unwrap();
    let detection: SocketAddr = "127.0.0.1:29102".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29103".parse().unwrap();

    common::start_path_echo_backend(dashboard).await;
    common::start_path_echo_backend(detection).await;
    let shutdown = common::spawn_gateway(common::test_config(proxy, dashboard, detection)).await;

    let client = common::fresh_client();
    let body = |path: &str| {
        let client = client.clone();
        let url = format!("http://{}{}", proxy, path);
        async move { client.get(url).send().await.unwrap().text().await.unwrap() }
    };

    // Detection prefix is stripped, query preserved.
    assert_eq!(body("/api/detection/anomalies?limit=10").await, "/anomalies?limit=10");
    assert_eq!(body("/api/detection").await, "/");
    // Dashboard API and root are forwarded verbatim, including sibling
    // paths that share the detection prefix text.
    assert_eq!(body("/api/stats").await, "/api/stats");
    assert_eq!(body("/api/detections/list").await, "/api/detections/list");
    assert_eq!(body("/").await, "/");
    assert_eq!(body("/health").await, "/health");

    shutdown.trigger();
}

#[tokio::test]
async fn security_headers_on_every_response() {
    let dashboard: SocketAddr = "127.0.0.1:29111".parse().unwrap();
    let detection: SocketAddr = "127.0.0.1:29112".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29113".parse().unwrap();

    common::start_path_echo_backend(dashboard).await;
    // Detection pool points at a closed port: proxied requests yield 502.
    let shutdown = common::spawn_gateway(common::test_config(proxy, dashboard, detection)).await;

    let client = common::fresh_client();
    let assert_headers = |response: &reqwest::Response| {
        let headers = response.headers();
        assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
        assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
        assert_eq!(headers.get("x-xss-protection").unwrap(), "1; mode=block");
        assert_eq!(
            headers.get("referrer-policy").unwrap(),
            "strict-origin-when-cross-origin"
        );
    };

    let ok = client.get(format!("http://{}/", proxy)).send().await.unwrap();
    assert_eq!(ok.status(), 200);
    assert_headers(&ok);

    let favicon = client
        .get(format!("http://{}/favicon.ico", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(favicon.status(), 204);
    assert_headers(&favicon);

    let denied = client
        .get(format!("http://{}/.env", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), 403);
    assert_headers(&denied);

    let bad_gateway = client
        .get(format!("http://{}/api/detection/x", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(bad_gateway.status(), 502);
    assert_headers(&bad_gateway);

    shutdown.trigger();
}

#[tokio::test]
async fn rate_limit_admits_exactly_burst() {
    let dashboard: SocketAddr = "127.0.0.1:29121".parse().unwrap();
    let detection: SocketAddr = "127.0.0.1:29122".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29123".parse().unwrap();

    common::start_path_echo_backend(dashboard).await;
    common::start_path_echo_backend(detection).await;

    let mut config = common::test_config(proxy, dashboard, detection);
    // Near-zero refill so the burst alone decides admission regardless of
    // how long the 25 sequential requests take.
    for zone in &mut config.zones {
        zone.rate_per_sec = 0.001;
    }
    let shutdown = common::spawn_gateway(config).await;

    let client = common::fresh_client();
    let mut admitted = 0;
    let mut rejected = 0;
    for _ in 0..25 {
        let status = client
            .get(format!("http://{}/api/detection/anomalies", proxy))
            .send()
            .await
            .unwrap()
            .status();
        match status.as_u16() {
            200 => admitted += 1,
            429 => rejected += 1,
            other => panic!("unexpected status {}", other),
        }
    }

    // The detection API route grants the api zone a burst of 20.
    assert_eq!(admitted, 20);
    assert_eq!(rejected, 5);

    shutdown.trigger();
}

#[tokio::test]
async fn rate_limit_carries_security_headers() {
    let dashboard: SocketAddr = "127.0.0.1:29131".parse().unwrap();
    let detection: SocketAddr = "127.0.0.1:29132".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29133".parse().unwrap();

    common::start_path_echo_backend(dashboard).await;
    common::start_path_echo_backend(detection).await;

    let mut config = common::test_config(proxy, dashboard, detection);
    for zone in &mut config.zones {
        zone.rate_per_sec = 0.001;
    }
    let shutdown = common::spawn_gateway(config).await;

    let client = common::fresh_client();
    let mut last = None;
    for _ in 0..16 {
        last = Some(
            client
                .get(format!("http://{}/api/stats", proxy))
                .send()
                .await
                .unwrap(),
        );
    }

    // The dashboard API route grants burst 15, so request 16 is rejected.
    let last = last.unwrap();
    assert_eq!(last.status(), 429);
    assert_eq!(last.headers().get("x-frame-options").unwrap(), "DENY");

    shutdown.trigger();
}

#[tokio::test]
async fn health_probe_bypasses_rate_limiting() {
    let dashboard: SocketAddr = "127.0.0.1:29141".parse().unwrap();
    let detection: SocketAddr = "127.0.0.1:29142".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29143".parse().unwrap();

    common::start_path_echo_backend(dashboard).await;
    common::start_path_echo_backend(detection).await;

    let mut config = common::test_config(proxy, dashboard, detection);
    for zone in &mut config.zones {
        zone.rate_per_sec = 0.001;
    }
    let shutdown = common::spawn_gateway(config).await;

    let client = common::fresh_client();
    for _ in 0..30 {
        let status = client
            .get(format!("http://{}/health", proxy))
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status, 200, "health probes must never be rate limited");
    }

    // The probes must not have consumed the dashboard zone's budget either:
    // the root route still admits its full burst of 10.
    for _ in 0..10 {
        let status = client
            .get(format!("http://{}/", proxy))
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status, 200);
    }

    shutdown.trigger();
}

#[tokio::test]
async fn static_assets_and_traversal() {
    let dashboard: SocketAddr = "127.0.0.1:29151".parse().unwrap();
    let detection: SocketAddr = "127.0.0.1:29152".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29153".parse().unwrap();

    common::start_path_echo_backend(dashboard).await;

    let static_root = std::env::temp_dir().join("edge-gateway-it-static");
    std::fs::create_dir_all(&static_root).unwrap();
    std::fs::write(static_root.join("app.css"), b"body{}").unwrap();

    let mut config = common::test_config(proxy, dashboard, detection);
    config.static_assets.root = static_root;
    let shutdown = common::spawn_gateway(config).await;

    let client = common::fresh_client();

    let hit = client
        .get(format!("http://{}/static/app.css", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(hit.status(), 200);
    assert_eq!(
        hit.headers().get("cache-control").unwrap(),
        "public, max-age=31536000, immutable"
    );
    assert!(hit.headers().contains_key("expires"));
    assert_eq!(hit.text().await.unwrap(), "body{}");

    let miss = client
        .get(format!("http://{}/static/missing.js", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(miss.status(), 404);

    // reqwest normalizes dot segments, so the traversal attempt goes in raw.
    let mut socket = TcpStream::connect(proxy).await.unwrap();
    socket
        .write_all(b"GET /static/../../etc/passwd HTTP/1.1\r\nHost: gateway\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = Vec::new();
    socket.read_to_end(&mut response).await.unwrap();
    let head = String::from_utf8_lossy(&response);
    assert!(
        head.starts_with("HTTP/1.1 403"),
        "traversal must be rejected: {}",
        head.lines().next().unwrap_or("")
    );

    shutdown.trigger();
}

#[tokio::test]
async fn upstream_connections_are_reused() {
    let dashboard: SocketAddr = "127.0.0.1:29161".parse().unwrap();
    let detection: SocketAddr = "127.0.0.1:29162".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29163".parse().unwrap();

    let connections = common::start_counting_backend(dashboard).await;
    let shutdown = common::spawn_gateway(common::test_config(proxy, dashboard, detection)).await;

    let client = common::fresh_client();
    for _ in 0..10 {
        let status = client
            .get(format!("http://{}/", proxy))
            .send()
            .await
            .unwrap()
            .status();
        assert_eq!(status, 200);
    }

    let opened = connections.load(Ordering::SeqCst);
    assert!(
        opened <= 3,
        "10 sequential requests should reuse pooled connections, opened {}",
        opened
    );

    shutdown.trigger();
}

#[tokio::test]
async fn upstream_down_yields_502() {
    let dashboard: SocketAddr = "127.0.0.1:29171".parse().unwrap();
    let detection: SocketAddr = "127.0.0.1:29172".parse().unwrap();
    let proxy: SocketAddr = "127.0.0.1:29173".parse().unwrap();

    // Neither backend is started.
    let shutdown = common::spawn_gateway(common::test_config(proxy, dashboard, detection)).await;

    let client = common::fresh_client();
    let response = client
        .get(format!("http://{}/api/stats", proxy))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 502);

    shutdown.trigger();
}
