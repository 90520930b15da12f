//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (path + query)
//!     → router.rs (fixed-priority lookup)
//!     → table.rs (rule kinds, actions)
//!     → Return: RouteDecision (terminal reply, static serve, or proxy
//!       target with rewritten upstream path)
//! ```
//!
//! # Design Decisions
//! - The table is compiled at startup and immutable at runtime
//! - No regex in the hot path: exact, prefix and dot-segment checks only
//! - First match wins; a default "/" prefix rule guarantees totality
//! - Deterministic: same path always produces the same decision

pub mod router;
pub mod table;

pub use router::{RouteDecision, Router};
pub use table::{MatchKind, ProxyTarget, RouteAction, RouteRule, ZoneRef};
