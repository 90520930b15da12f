//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream address
//! - Track availability from passive connect-failure observations

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

/// Availability state.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityState {
    Unknown = 0,
    Up = 1,
    Down = 2,
}

impl From<u8> for AvailabilityState {
    fn from(val: u8) -> Self {
        match val {
            1 => AvailabilityState::Up,
            2 => AvailabilityState::Down,
            _ => AvailabilityState::Unknown,
        }
    }
}

/// A single upstream server.
#[derive(Debug)]
pub struct Backend {
    /// The address of the backend.
    pub addr: SocketAddr,
    /// Pre-formatted authority ("host:port") for URI rewriting.
    pub authority: String,
    state: AtomicU8,
    consecutive_failures: AtomicU32,
}

impl Backend {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            authority: addr.to_string(),
            state: AtomicU8::new(AvailabilityState::Unknown as u8),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    /// True unless passive tracking has marked the backend down.
    pub fn is_available(&self) -> bool {
        self.state.load(Ordering::Relaxed) != AvailabilityState::Down as u8
    }

    pub fn state(&self) -> AvailabilityState {
        self.state.load(Ordering::Relaxed).into()
    }

    /// Report a successful exchange with the backend.
    pub fn mark_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        self.state.store(AvailabilityState::Up as u8, Ordering::Relaxed);
    }

    /// Report a connect failure. After `threshold` consecutive failures the
    /// backend is marked down and round-robin starts skipping it.
    pub fn mark_connect_failure(&self, threshold: u32) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures >= threshold {
            if self.state.swap(AvailabilityState::Down as u8, Ordering::Relaxed)
                != AvailabilityState::Down as u8
            {
                tracing::warn!(addr = %self.addr, failures, "Backend marked down");
            }
        }
    }
}
