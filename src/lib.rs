//! Edge gateway library.
//!
//! Path-based routing across backend pools, per-zone token-bucket rate
//! limiting, WebSocket passthrough, pooled upstream connections, and static
//! asset serving for the detection/dashboard deployment.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;
pub mod upstream;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
