//! WebSocket passthrough.
//!
//! # Responsibilities
//! - Detect Upgrade: websocket requests on upgrade-aware routes
//! - Relay the handshake to the backend
//! - On 101, splice both upgraded connections as raw byte streams
//!
//! # Design Decisions
//! - Byte-level splice (tokio copy_bidirectional), no frame parsing: the
//!   gateway never inspects WebSocket traffic
//! - A backend that answers anything but 101 has its response relayed
//!   verbatim
//! - The splice runs until either side closes or no bytes move for the
//!   configured idle window (24 hours by default); active sessions are
//!   never cut

use std::net::IpAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Request, Response, StatusCode, Version};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::error::{GatewayError, Result};
use crate::http::proxy;
use crate::observability::metrics;
use crate::upstream::UpstreamPool;

/// True when the request asks to switch protocols to WebSocket.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
}

/// Wall-clock record of the last time bytes moved through a splice.
struct Activity {
    epoch: Instant,
    last_millis: AtomicU64,
}

impl Activity {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            epoch: Instant::now(),
            last_millis: AtomicU64::new(0),
        })
    }

    fn touch(&self) {
        self.last_millis
            .store(self.epoch.elapsed().as_millis() as u64, Ordering::Relaxed);
    }

    fn idle_for(&self) -> Duration {
        let last = Duration::from_millis(self.last_millis.load(Ordering::Relaxed));
        self.epoch.elapsed().saturating_sub(last)
    }
}

/// IO adapter that touches the activity record whenever bytes move.
struct Monitored<S> {
    inner: S,
    activity: Arc<Activity>,
}

impl<S> Monitored<S> {
    fn new(inner: S, activity: Arc<Activity>) -> Self {
        Self { inner, activity }
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Monitored<S> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        let filled = buf.filled().len();
        let result = Pin::new(&mut self.inner).poll_read(cx, buf);
        if matches!(result, Poll::Ready(Ok(()))) && buf.filled().len() > filled {
            self.activity.touch();
        }
        result
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Monitored<S> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let result = Pin::new(&mut self.inner).poll_write(cx, buf);
        if matches!(result, Poll::Ready(Ok(n)) if n > 0) {
            self.activity.touch();
        }
        result
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Relay a WebSocket handshake and, on success, splice both connections.
///
/// Returns the backend's handshake response either way; the splice itself
/// runs in a detached task after the 101 reaches the client.
pub async fn proxy_upgrade(
    pool: Arc<UpstreamPool>,
    upstream_path: &str,
    client_ip: IpAddr,
    mut request: Request<Body>,
    idle_cap: Duration,
) -> Result<Response<Body>> {
    let backend = pool.select();

    // The upgrade future must be taken before the request is consumed.
    let client_upgrade = hyper::upgrade::on(&mut request);
    let (mut parts, _body) = request.into_parts();

    proxy::prepare_headers(&mut parts.headers, client_ip, &backend.authority);
    // Re-add the switching-protocol headers the hop-by-hop strip removed.
    parts
        .headers
        .insert(header::CONNECTION, HeaderValue::from_static("Upgrade"));
    parts
        .headers
        .insert(header::UPGRADE, HeaderValue::from_static("websocket"));
    parts.uri = proxy::upstream_uri(&backend.authority, upstream_path)?;
    parts.version = Version::HTTP_11;

    let outbound = Request::from_parts(parts, Body::empty());

    let mut response = match pool.client().request(outbound).await {
        Ok(response) => response,
        Err(e) if e.is_connect() => {
            backend.mark_connect_failure(pool.failure_threshold);
            return Err(GatewayError::Connect {
                addr: backend.authority.clone(),
                reason: e.to_string(),
            });
        }
        Err(e) => {
            return Err(GatewayError::Upstream {
                addr: backend.authority.clone(),
                reason: e.to_string(),
            });
        }
    };

    backend.mark_success();

    if response.status() != StatusCode::SWITCHING_PROTOCOLS {
        // Backend declined the upgrade; relay its answer verbatim.
        return Ok(response.map(Body::new));
    }

    metrics::record_websocket_splice(&pool.name);
    let upstream_upgrade = hyper::upgrade::on(&mut response);
    let backend_addr = backend.authority.clone();

    tokio::spawn(async move {
        let (client_io, upstream_io) =
            match tokio::try_join!(client_upgrade, upstream_upgrade) {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(backend = %backend_addr, error = %e, "WebSocket upgrade failed");
                    return;
                }
            };

        let activity = Activity::new();
        let mut client_io = Monitored::new(TokioIo::new(client_io), activity.clone());
        let mut upstream_io = Monitored::new(TokioIo::new(upstream_io), activity.clone());

        let splice = tokio::io::copy_bidirectional(&mut client_io, &mut upstream_io);
        tokio::pin!(splice);

        loop {
            let idle = activity.idle_for();
            if idle >= idle_cap {
                tracing::warn!(backend = %backend_addr, cap = ?idle_cap, "WebSocket session idle past cap, closing");
                break;
            }
            tokio::select! {
                result = &mut splice => {
                    match result {
                        Ok((to_backend, to_client)) => {
                            tracing::debug!(
                                backend = %backend_addr,
                                to_backend,
                                to_client,
                                "WebSocket session closed"
                            );
                        }
                        Err(e) => {
                            tracing::debug!(backend = %backend_addr, error = %e, "WebSocket splice ended with error");
                        }
                    }
                    break;
                }
                _ = tokio::time::sleep(idle_cap - idle) => {}
            }
        }
    });

    // The 101 (with the backend's Sec-WebSocket-Accept) goes back to the
    // client; hyper performs the connection upgrade once it is sent.
    Ok(response.map(|_| Body::empty()))
}
