//! Per-zone, per-client token-bucket rate limiting.
//!
//! Each zone owns one lazily-created bucket per client IP, refilled
//! continuously at the zone rate. Admission is immediate-reject past burst;
//! there is no queuing or delay. A background sweep evicts idle buckets and
//! bounds the table size.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::config::{RateLimitConfig, ZoneConfig};
use crate::observability::metrics;

/// A simple token bucket.
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
        }
    }

    /// Refill at `refill_rate` tokens/second capped at `capacity`, then try
    /// to consume one token.
    fn try_acquire(&mut self, capacity: f64, refill_rate: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    zone: &'static str,
    client: IpAddr,
}

/// Zone-keyed rate limiter shared by all connections.
pub struct RateLimiter {
    buckets: DashMap<BucketKey, TokenBucket>,
    /// Zone name → refill rate (req/s).
    rates: HashMap<String, f64>,
    idle: Duration,
    max_keys: usize,
    sweep_interval: Duration,
}

impl RateLimiter {
    pub fn new(zones: &[ZoneConfig], config: &RateLimitConfig) -> Self {
        let rates = zones
            .iter()
            .map(|z| (z.name.clone(), z.rate_per_sec))
            .collect();

        Self {
            buckets: DashMap::new(),
            rates,
            idle: Duration::from_secs(config.idle_secs),
            max_keys: config.max_keys,
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
        }
    }

    /// Admit or reject one request for `client` in `zone`.
    ///
    /// `burst` is the bucket capacity granted by the matched route; the
    /// refill rate comes from the zone definition. Unknown zones admit, but
    /// config validation rules them out before startup.
    pub fn admit(&self, zone: &'static str, burst: u32, client: IpAddr) -> bool {
        let Some(rate) = self.rates.get(zone).copied() else {
            return true;
        };

        let key = BucketKey { zone, client };
        let capacity = burst as f64;
        let allowed = self
            .buckets
            .entry(key)
            .or_insert_with(|| TokenBucket::new(capacity))
            .try_acquire(capacity, rate);

        if !allowed {
            metrics::record_rate_limited(zone);
        }
        allowed
    }

    /// Number of (zone, client) buckets currently tracked.
    pub fn tracked_keys(&self) -> usize {
        self.buckets.len()
    }

    /// Evict idle buckets, then oldest-first down to the size cap.
    pub fn sweep(&self) {
        let now = Instant::now();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last_update) < self.idle);

        let excess = self.buckets.len().saturating_sub(self.max_keys);
        if excess > 0 {
            let mut entries: Vec<(BucketKey, Instant)> = self
                .buckets
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().last_update))
                .collect();
            entries.sort_by_key(|(_, last_update)| *last_update);
            for (key, _) in entries.into_iter().take(excess) {
                self.buckets.remove(&key);
            }
            tracing::debug!(evicted = excess, "Rate limiter over size cap, evicted oldest buckets");
        }
    }

    /// Periodic eviction loop; exits on shutdown signal.
    pub async fn run_sweeper(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.sweep_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.sweep(),
                _ = shutdown.recv() => {
                    tracing::debug!("Rate limiter sweeper exiting");
                    break;
                }
            }
        }
    }
}
