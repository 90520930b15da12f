//! Gateway server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the axum router and wire up middleware (request id, tracing,
//!   concurrency bound, security headers)
//! - Dispatch every request through the route table
//! - Apply zone rate limiting before any proxy work
//! - Serve with graceful shutdown

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Router as AxumRouter,
};
use tokio::net::TcpListener;
use tower::limit::GlobalConcurrencyLimitLayer;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::http::{proxy, static_files, websocket};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::routing::{ProxyTarget, RouteAction, Router};
use crate::security::{headers, RateLimiter};
use crate::upstream::PoolManager;

/// Application state injected into the dispatch handler.
#[derive(Clone)]
pub struct AppState {
    pub router: Arc<Router>,
    pub pools: Arc<PoolManager>,
    pub limiter: Arc<RateLimiter>,
    pub static_root: PathBuf,
    pub websocket_idle_cap: Duration,
}

/// The gateway's HTTP server.
pub struct GatewayServer {
    app: AxumRouter,
    limiter: Arc<RateLimiter>,
}

impl GatewayServer {
    /// Build all subsystems from a validated configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let router = Arc::new(Router::from_config(&config));
        let pools = Arc::new(PoolManager::new(&config.pools));
        let limiter = Arc::new(RateLimiter::new(&config.zones, &config.rate_limit));

        let state = AppState {
            router,
            pools,
            limiter: limiter.clone(),
            static_root: config.static_assets.root.clone(),
            websocket_idle_cap: Duration::from_secs(config.timeouts.websocket_secs),
        };

        let app = AxumRouter::new()
            .route("/", any(gateway_handler))
            .route("/{*path}", any(gateway_handler))
            .with_state(state)
            .layer(GlobalConcurrencyLimitLayer::new(config.listener.max_connections))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

        // Outermost, so error responses carry the set too.
        let app = headers::with_security_headers(app);

        Self { app, limiter }
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(self, listener: TcpListener, shutdown: &Shutdown) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Gateway listening");

        tokio::spawn(self.limiter.clone().run_sweeper(shutdown.subscribe()));

        let mut rx = shutdown.subscribe();
        axum::serve(
            listener,
            self.app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            let _ = rx.recv().await;
        })
        .await?;

        tracing::info!("Gateway stopped");
        Ok(())
    }
}

/// Single dispatch point: every request, any method, any path.
async fn gateway_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let decision = state.router.route(request.uri());
    let rule_name = decision.rule.name;
    let bypass_log = decision.rule.bypass_log;
    let upstream_path = decision.upstream_path;

    let response = match &decision.rule.action {
        RouteAction::NoContent => StatusCode::NO_CONTENT.into_response(),
        RouteAction::Deny => (StatusCode::FORBIDDEN, "Forbidden").into_response(),
        RouteAction::Static => static_files::serve(&state.static_root, &path).await,
        RouteAction::Proxy(target) => {
            handle_proxy(&state, target, rule_name, &upstream_path, addr, request).await
        }
    };

    if !bypass_log {
        tracing::info!(
            method = %method,
            path = %path,
            route = rule_name,
            status = response.status().as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            client = %addr.ip(),
            "request"
        );
    }
    metrics::record_request(method.as_str(), response.status().as_u16(), rule_name, start);

    response
}

/// Rate-check, then forward either as a buffered exchange or an upgrade
/// splice.
async fn handle_proxy(
    state: &AppState,
    target: &ProxyTarget,
    rule_name: &'static str,
    upstream_path: &str,
    addr: SocketAddr,
    request: Request<Body>,
) -> Response {
    if let Some(zone) = &target.zone {
        if !state.limiter.admit(zone.name, zone.burst, addr.ip()) {
            return (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response();
        }
    }

    let Some(pool) = state.pools.get(target.pool) else {
        tracing::error!(route = rule_name, pool = target.pool, "Pool missing at dispatch");
        return error_response(GatewayError::UnknownPool(target.pool.to_string()));
    };

    let result = if target.upgrade_aware && websocket::is_upgrade_request(request.headers()) {
        websocket::proxy_upgrade(pool, upstream_path, addr.ip(), request, state.websocket_idle_cap)
            .await
    } else {
        proxy::forward(
            &pool,
            target.request_timeout,
            upstream_path,
            addr.ip(),
            request,
        )
        .await
    };

    match result {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(route = rule_name, pool = target.pool, error = %e, "Upstream error");
            metrics::record_upstream_error(target.pool, e.kind());
            error_response(e)
        }
    }
}

fn error_response(error: GatewayError) -> Response {
    let status = error.status();
    let body = match status {
        StatusCode::BAD_GATEWAY => "Bad gateway",
        StatusCode::GATEWAY_TIMEOUT => "Gateway timeout",
        StatusCode::BAD_REQUEST => "Bad request",
        _ => "Internal error",
    };
    (status, body).into_response()
}
