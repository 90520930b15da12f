//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-zone, per-client token buckets → 429)
//!     → Pass to routing/proxy
//! Outgoing response (every response, including errors):
//!     → headers.rs (fixed security header set)
//! ```
//!
//! # Design Decisions
//! - Fail closed: a rejected request never reaches an upstream
//! - Headers are applied at the outermost layer so 403/429/502 carry them too
//! - No trust in client input

pub mod headers;
pub mod rate_limit;

pub use rate_limit::RateLimiter;
