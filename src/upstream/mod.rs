//! Upstream pool subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → pool name identified
//!     → pool.rs (round-robin backend selection, pooled HTTP client)
//!     → backend.rs (passive connect-failure tracking)
//!     → Forward request / splice upgrade
//! ```
//!
//! # Design Decisions
//! - One pooled hyper client per pool; its idle pool enforces the
//!   keepalive cap per backend
//! - Round-robin prefers backends not marked down, but when every backend
//!   in a pool is down the rotation continues so recovery gets probed
//! - No per-request failover: a connect failure is surfaced as 502

pub mod backend;
pub mod pool;

pub use backend::Backend;
pub use pool::{PoolManager, UpstreamPool};
