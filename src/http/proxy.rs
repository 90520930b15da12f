//! Buffered request forwarding to upstream pools.
//!
//! # Responsibilities
//! - Rewrite the request URI to the selected backend
//! - Replace Host, set X-Real-IP, append X-Forwarded-For, set
//!   X-Forwarded-Proto; strip hop-by-hop headers
//! - Map connect failures to 502 and deadline misses to 504, with no retry
//!   and no cross-backend failover
//! - Stream the backend response back unmodified

use std::net::IpAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{header, HeaderMap, HeaderValue, Request, Response, Uri, Version};
use tokio::time::timeout;

use crate::error::{GatewayError, Result};
use crate::upstream::UpstreamPool;

/// Hop-by-hop headers never forwarded to the backend. `Connection` and
/// `Upgrade` are re-added by the websocket path when relaying a handshake.
const HOP_BY_HOP: [header::HeaderName; 8] = [
    header::CONNECTION,
    header::HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Prepare request headers for forwarding.
pub fn prepare_headers(headers: &mut HeaderMap, client_ip: IpAddr, authority: &str) {
    for name in HOP_BY_HOP {
        headers.remove(&name);
    }

    if let Ok(value) = HeaderValue::from_str(authority) {
        headers.insert(header::HOST, value);
    }

    let client = client_ip.to_string();
    if let Ok(value) = HeaderValue::from_str(&client) {
        headers.insert("x-real-ip", value);
    }

    let forwarded_for = match headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        Some(existing) => format!("{}, {}", existing, client),
        None => client,
    };
    if let Ok(value) = HeaderValue::from_str(&forwarded_for) {
        headers.insert("x-forwarded-for", value);
    }

    headers.insert("x-forwarded-proto", HeaderValue::from_static("http"));
}

/// Build the upstream URI from the backend authority and the rewritten
/// path-and-query.
pub fn upstream_uri(authority: &str, path_and_query: &str) -> Result<Uri> {
    let authority: Authority = authority
        .parse()
        .map_err(|_| GatewayError::BadRequest(format!("bad authority: {authority}")))?;
    let path_and_query: PathAndQuery = path_and_query
        .parse()
        .map_err(|_| GatewayError::BadRequest(format!("bad path: {path_and_query}")))?;

    Uri::builder()
        .scheme(Scheme::HTTP)
        .authority(authority)
        .path_and_query(path_and_query)
        .build()
        .map_err(|e| GatewayError::BadRequest(e.to_string()))
}

/// Forward one buffered request to the pool's next backend and stream the
/// response back.
pub async fn forward(
    pool: &UpstreamPool,
    request_timeout: Option<Duration>,
    upstream_path: &str,
    client_ip: IpAddr,
    request: Request<Body>,
) -> Result<Response<Body>> {
    let backend = pool.select();
    let (mut parts, body) = request.into_parts();

    prepare_headers(&mut parts.headers, client_ip, &backend.authority);
    parts.uri = upstream_uri(&backend.authority, upstream_path)?;
    // Upstream connections are plain HTTP/1.1 regardless of what the client
    // spoke to the gateway.
    parts.version = Version::HTTP_11;

    let outbound = Request::from_parts(parts, body);
    let exchange = pool.client().request(outbound);

    let result = match request_timeout {
        Some(deadline) => timeout(deadline, exchange)
            .await
            .map_err(|_| GatewayError::Timeout(deadline))?,
        None => exchange.await,
    };

    match result {
        Ok(response) => {
            backend.mark_success();
            Ok(response.map(Body::new))
        }
        Err(e) if e.is_connect() => {
            backend.mark_connect_failure(pool.failure_threshold);
            Err(GatewayError::Connect {
                addr: backend.authority.clone(),
                reason: e.to_string(),
            })
        }
        Err(e) => Err(GatewayError::Upstream {
            addr: backend.authority.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_headers_set() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("gateway.example"));
        headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

        prepare_headers(&mut headers, "203.0.113.7".parse().unwrap(), "127.0.0.1:8000");

        assert_eq!(headers.get(header::HOST).unwrap(), "127.0.0.1:8000");
        assert_eq!(headers.get("x-real-ip").unwrap(), "203.0.113.7");
        assert_eq!(headers.get("x-forwarded-for").unwrap(), "203.0.113.7");
        assert_eq!(headers.get("x-forwarded-proto").unwrap(), "http");
        assert!(headers.get(header::CONNECTION).is_none());
    }

    #[test]
    fn forwarded_for_appends() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("198.51.100.1"),
        );

        prepare_headers(&mut headers, "203.0.113.7".parse().unwrap(), "127.0.0.1:8000");

        assert_eq!(
            headers.get("x-forwarded-for").unwrap(),
            "198.51.100.1, 203.0.113.7"
        );
    }

    #[test]
    fn upstream_uri_carries_query() {
        let uri = upstream_uri("127.0.0.1:8001", "/anomalies?limit=10").unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:8001/anomalies?limit=10");
    }
}
