//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default: the defaults describe the standard two-service
//! deployment (dashboard on 127.0.0.1:8000, detection API on 127.0.0.1:8001).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, TLS material paths).
    pub listener: ListenerConfig,

    /// Upstream pool definitions.
    pub pools: Vec<PoolConfig>,

    /// Rate-limiting zone definitions.
    pub zones: Vec<ZoneConfig>,

    /// Rate-limiter bucket table sizing and eviction.
    pub rate_limit: RateLimitConfig,

    /// Per-route-group timeouts.
    pub timeouts: TimeoutConfig,

    /// Static asset serving.
    pub static_assets: StaticConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl GatewayConfig {
    /// The built-in configuration used when no config file is given:
    /// defaults plus the standard pools and zones.
    pub fn standard() -> Self {
        Self {
            pools: default_pools(),
            zones: default_zones(),
            ..Self::default()
        }
    }

    /// Fill in pools/zones with the standard set when a config file left
    /// them empty.
    pub fn with_standard_fallbacks(mut self) -> Self {
        if self.pools.is_empty() {
            self.pools = default_pools();
        }
        if self.zones.is_empty() {
            self.zones = default_zones();
        }
        self
    }

    /// Look up a pool definition by name.
    pub fn pool(&self, name: &str) -> Option<&PoolConfig> {
        self.pools.iter().find(|p| p.name == name)
    }

    /// Look up a zone definition by name.
    pub fn zone(&self, name: &str) -> Option<&ZoneConfig> {
        self.zones.iter().find(|z| z.name == name)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum in-flight requests (backpressure bound).
    pub max_connections: usize,

    /// Optional TLS material. Kept for deployment parity; the gateway
    /// serves plain HTTP and these paths are not read.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
            tls: None,
        }
    }
}

/// TLS material paths (inactive).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// A named upstream pool.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Pool name referenced by the route table ("dashboard", "detection").
    pub name: String,

    /// Backend addresses (host:port). Round-robin when more than one.
    pub addresses: Vec<String>,

    /// Maximum idle connections kept open per backend.
    #[serde(default = "default_keepalive")]
    pub keepalive: usize,

    /// Connection establishment timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Consecutive connect failures before round-robin selection starts
    /// skipping a backend.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
}

fn default_keepalive() -> usize {
    32
}

fn default_connect_timeout() -> u64 {
    30
}

fn default_failure_threshold() -> u32 {
    3
}

/// A named rate-limiting zone.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZoneConfig {
    /// Zone name referenced by the route table ("api", "dashboard").
    pub name: String,

    /// Sustained admission rate in requests per second per client IP.
    pub rate_per_sec: f64,
}

/// Rate-limiter table sizing and eviction.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Seconds of inactivity after which a client's bucket is evicted.
    pub idle_secs: u64,

    /// Upper bound on tracked (zone, client) buckets across all zones.
    /// Oldest buckets are evicted first when the bound is exceeded.
    pub max_keys: usize,

    /// Interval between eviction sweeps in seconds.
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            idle_secs: 60,
            max_keys: 65_536,
            sweep_interval_secs: 30,
        }
    }
}

/// Per-route-group timeouts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// End-to-end timeout for detection API requests in seconds.
    pub detection_secs: u64,

    /// End-to-end timeout for dashboard and default routes in seconds.
    pub default_secs: u64,

    /// Seconds a spliced WebSocket session may sit with no traffic in
    /// either direction before it is closed.
    pub websocket_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            detection_secs: 30,
            default_secs: 60,
            websocket_secs: 86_400,
        }
    }
}

/// Static asset serving configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticConfig {
    /// Directory aliased under the /static/ URL prefix.
    pub root: PathBuf,
}

impl Default for StaticConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./static"),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Default pools for the standard deployment.
pub fn default_pools() -> Vec<PoolConfig> {
    vec![
        PoolConfig {
            name: "dashboard".to_string(),
            addresses: vec!["127.0.0.1:8000".to_string()],
            keepalive: default_keepalive(),
            connect_timeout_secs: 60,
            failure_threshold: default_failure_threshold(),
        },
        PoolConfig {
            name: "detection".to_string(),
            addresses: vec!["127.0.0.1:8001".to_string()],
            keepalive: default_keepalive(),
            connect_timeout_secs: 30,
            failure_threshold: default_failure_threshold(),
        },
    ]
}

/// Default zones: api at 10 r/s, dashboard at 5 r/s.
pub fn default_zones() -> Vec<ZoneConfig> {
    vec![
        ZoneConfig {
            name: "api".to_string(),
            rate_per_sec: 10.0,
        },
        ZoneConfig {
            name: "dashboard".to_string(),
            rate_per_sec: 5.0,
        },
    ]
}
