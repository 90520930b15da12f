//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (axum setup, request id, security headers, dispatch)
//!     → routing decides: terminal reply, static asset, or proxy
//!     → proxy.rs (buffered request/response forwarding)
//!     → websocket.rs (upgrade handshake relay + raw byte splice)
//!     → static_files.rs (aliased directory with immutable cache headers)
//! ```

pub mod proxy;
pub mod server;
pub mod static_files;
pub mod websocket;

pub use server::GatewayServer;
