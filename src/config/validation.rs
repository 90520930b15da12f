//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (the route table references the
//!   "dashboard"/"detection" pools and "api"/"dashboard" zones)
//! - Validate value ranges (rates and timeouts positive, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system; the binary exits with
//!   code 1 when it fails

use std::collections::HashSet;
use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

/// A single semantic configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Pool names the fixed route table dispatches to.
const REQUIRED_POOLS: [&str; 2] = ["dashboard", "detection"];

/// Zone names the fixed route table rate-limits with.
const REQUIRED_ZONES: [&str; 2] = ["api", "dashboard"];

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a valid socket address: {}", config.listener.bind_address),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new(
            "listener.max_connections",
            "must be greater than zero",
        ));
    }

    let mut pool_names = HashSet::new();
    for pool in &config.pools {
        let field = format!("pools.{}", pool.name);
        if pool.name.is_empty() {
            errors.push(ValidationError::new("pools", "pool name must not be empty"));
        }
        if !pool_names.insert(pool.name.as_str()) {
            errors.push(ValidationError::new(&field, "duplicate pool name"));
        }
        if pool.addresses.is_empty() {
            errors.push(ValidationError::new(&field, "pool has no backend addresses"));
        }
        for addr in &pool.addresses {
            if addr.parse::<SocketAddr>().is_err() {
                errors.push(ValidationError::new(
                    &field,
                    format!("not a valid backend address: {}", addr),
                ));
            }
        }
        if pool.keepalive == 0 {
            errors.push(ValidationError::new(&field, "keepalive must be greater than zero"));
        }
        if pool.connect_timeout_secs == 0 {
            errors.push(ValidationError::new(
                &field,
                "connect_timeout_secs must be greater than zero",
            ));
        }
    }
    for required in REQUIRED_POOLS {
        if !pool_names.contains(required) {
            errors.push(ValidationError::new(
                "pools",
                format!("route table requires a pool named {:?}", required),
            ));
        }
    }

    let mut zone_names = HashSet::new();
    for zone in &config.zones {
        let field = format!("zones.{}", zone.name);
        if !zone_names.insert(zone.name.as_str()) {
            errors.push(ValidationError::new(&field, "duplicate zone name"));
        }
        if zone.rate_per_sec <= 0.0 {
            errors.push(ValidationError::new(&field, "rate_per_sec must be positive"));
        }
    }
    for required in REQUIRED_ZONES {
        if !zone_names.contains(required) {
            errors.push(ValidationError::new(
                "zones",
                format!("route table requires a zone named {:?}", required),
            ));
        }
    }

    if config.rate_limit.max_keys == 0 {
        errors.push(ValidationError::new(
            "rate_limit.max_keys",
            "must be greater than zero",
        ));
    }
    if config.timeouts.detection_secs == 0
        || config.timeouts.default_secs == 0
        || config.timeouts.websocket_secs == 0
    {
        errors.push(ValidationError::new("timeouts", "timeouts must be greater than zero"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
