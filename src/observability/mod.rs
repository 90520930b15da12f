//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging via tracing; level set by config, overridable with
//!   RUST_LOG
//! - Routes marked bypass_log are excluded from access logging but still
//!   visible at debug level through the HTTP trace layer
//! - Metric updates are cheap enough for the hot path

pub mod logging;
pub mod metrics;
