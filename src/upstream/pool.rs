//! Upstream pool management.
//!
//! # Responsibilities
//! - Group backends into named pools
//! - Round-robin selection with availability-aware skip
//! - Own one pooled HTTP client per pool (keepalive cap, connect timeout)

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::PoolConfig;
use crate::upstream::backend::Backend;

/// A named group of backends sharing one pooled client.
#[derive(Debug)]
pub struct UpstreamPool {
    pub name: String,
    backends: Vec<Arc<Backend>>,
    cursor: AtomicUsize,
    client: Client<HttpConnector, Body>,
    /// Consecutive connect failures before a backend is skipped.
    pub failure_threshold: u32,
}

impl UpstreamPool {
    /// Build a pool from configuration. Returns None when no address parses;
    /// validation reports that before startup, so this only guards the
    /// manager against inconsistent input.
    fn from_config(config: &PoolConfig) -> Option<Self> {
        let backends: Vec<Arc<Backend>> = config
            .addresses
            .iter()
            .filter_map(|addr| match addr.parse() {
                Ok(addr) => Some(Arc::new(Backend::new(addr))),
                Err(_) => {
                    tracing::warn!(pool = %config.name, address = %addr, "Invalid backend address");
                    None
                }
            })
            .collect();

        if backends.is_empty() {
            return None;
        }

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.connect_timeout_secs)));

        // The client's idle pool is the keepalive mechanism: up to
        // `keepalive` idle connections are retained per backend, extra
        // connections are closed after use.
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(config.keepalive)
            .pool_idle_timeout(Duration::from_secs(60))
            .build(connector);

        Some(Self {
            name: config.name.clone(),
            backends,
            cursor: AtomicUsize::new(0),
            client,
            failure_threshold: config.failure_threshold,
        })
    }

    /// Select the next backend round-robin, preferring available ones. When
    /// every backend is marked down, the rotation continues anyway so a
    /// recovered backend gets re-probed; single-backend pools therefore
    /// always select their one address.
    pub fn select(&self) -> Arc<Backend> {
        let len = self.backends.len();
        let start = self.cursor.fetch_add(1, Ordering::Relaxed);

        for i in 0..len {
            let backend = &self.backends[(start + i) % len];
            if backend.is_available() {
                return backend.clone();
            }
        }
        self.backends[start % len].clone()
    }

    /// The pooled client used for every request to this pool.
    pub fn client(&self) -> &Client<HttpConnector, Body> {
        &self.client
    }

    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }
}

/// Holds every configured pool, looked up by name at dispatch time.
#[derive(Debug)]
pub struct PoolManager {
    pools: HashMap<String, Arc<UpstreamPool>>,
}

impl PoolManager {
    pub fn new(configs: &[PoolConfig]) -> Self {
        let mut pools = HashMap::new();
        for config in configs {
            match UpstreamPool::from_config(config) {
                Some(pool) => {
                    tracing::info!(
                        pool = %config.name,
                        backends = pool.backends.len(),
                        keepalive = config.keepalive,
                        connect_timeout_secs = config.connect_timeout_secs,
                        "Upstream pool configured"
                    );
                    pools.insert(config.name.clone(), Arc::new(pool));
                }
                None => {
                    tracing::warn!(pool = %config.name, "Pool has no usable backends, skipping");
                }
            }
        }
        Self { pools }
    }

    pub fn get(&self, name: &str) -> Option<Arc<UpstreamPool>> {
        self.pools.get(name).cloned()
    }
}
