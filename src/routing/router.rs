//! Route lookup and path rewriting.
//!
//! # Responsibilities
//! - Store the compiled rule list
//! - Look up the single matching rule for a request path
//! - Produce the upstream path (prefix strip, query preservation)
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan over a fixed, small rule list
//! - Totality via an explicit default rule rather than a silent fallthrough

use axum::http::Uri;

use crate::config::GatewayConfig;
use crate::routing::table::{default_rule, standard_rules, RouteAction, RouteRule};

/// The outcome of matching one request against the table.
#[derive(Debug)]
pub struct RouteDecision<'a> {
    /// The rule that matched.
    pub rule: &'a RouteRule,
    /// Path and query to present to the upstream (prefix already stripped).
    pub upstream_path: String,
}

/// Immutable route table with fixed-priority matching.
#[derive(Debug)]
pub struct Router {
    rules: Vec<RouteRule>,
    fallback: RouteRule,
}

impl Router {
    /// Compile the standard gateway table from configuration.
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            rules: standard_rules(config),
            fallback: default_rule(config),
        }
    }

    /// Match a request URI against the table. Exactly one rule matches any
    /// path; the catch-all "/" rule is the floor.
    pub fn route(&self, uri: &Uri) -> RouteDecision<'_> {
        let path = uri.path();
        let rule = self
            .rules
            .iter()
            .find(|rule| rule.matches(path))
            .unwrap_or(&self.fallback);

        RouteDecision {
            rule,
            upstream_path: rewrite_path(rule, path, uri.query()),
        }
    }

    /// All rules in priority order, catch-all last. Used by tests and the
    /// startup log.
    pub fn rules(&self) -> impl Iterator<Item = &RouteRule> {
        self.rules.iter().chain(std::iter::once(&self.fallback))
    }
}

/// Apply the rule's prefix strip and re-attach the query string.
///
/// Stripping `/api/detection` from `/api/detection/S` yields `/S`; from
/// `/api/detection` alone it yields `/`. The query string is forwarded
/// verbatim either way.
fn rewrite_path(rule: &RouteRule, path: &str, query: Option<&str>) -> String {
    let stripped = match &rule.action {
        RouteAction::Proxy(target) => match target.strip_prefix {
            Some(prefix) => {
                let rest = path.strip_prefix(prefix).unwrap_or(path);
                if rest.is_empty() {
                    "/".to_string()
                } else if rest.starts_with('/') {
                    rest.to_string()
                } else {
                    format!("/{}", rest)
                }
            }
            None => path.to_string(),
        },
        _ => path.to_string(),
    };

    match query {
        Some(q) => format!("{}?{}", stripped, q),
        None => stripped,
    }
}
