//! Route rule model and the fixed gateway table.

use std::time::Duration;

use crate::config::GatewayConfig;

/// How a rule matches a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchKind {
    /// Entire path equals the pattern.
    Exact(&'static str),
    /// Any path segment starts with a dot (dotfile access).
    DotSegment,
    /// Path starts with the pattern.
    Prefix(&'static str),
    /// Path equals the pattern or continues past it at a `/` boundary, so
    /// sibling paths sharing the prefix text do not match.
    SegmentPrefix(&'static str),
}

impl MatchKind {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            MatchKind::Exact(pattern) => path == *pattern,
            MatchKind::DotSegment => path.split('/').any(|seg| seg.starts_with('.')),
            MatchKind::Prefix(pattern) => path.starts_with(pattern),
            MatchKind::SegmentPrefix(pattern) => path
                .strip_prefix(pattern)
                .map(|rest| rest.is_empty() || rest.starts_with('/'))
                .unwrap_or(false),
        }
    }
}

/// Reference to a rate zone plus the burst capacity this route grants.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRef {
    pub name: &'static str,
    pub burst: u32,
}

/// Proxy dispatch parameters for a matched rule.
#[derive(Debug, Clone)]
pub struct ProxyTarget {
    /// Upstream pool name.
    pub pool: &'static str,
    /// Leading path segment removed before forwarding, if any.
    pub strip_prefix: Option<&'static str>,
    /// Rate zone applied before proxying, if any.
    pub zone: Option<ZoneRef>,
    /// Whether an Upgrade: websocket request on this route becomes a raw
    /// bidirectional splice.
    pub upgrade_aware: bool,
    /// End-to-end timeout for buffered request/response exchanges.
    /// None for upgrade splices, which run until either side closes.
    pub request_timeout: Option<Duration>,
}

/// What the gateway does with a matched request.
#[derive(Debug, Clone)]
pub enum RouteAction {
    /// Terminal 204 reply.
    NoContent,
    /// Terminal 403 reply.
    Deny,
    /// Serve from the static asset root.
    Static,
    /// Forward to an upstream pool.
    Proxy(ProxyTarget),
}

/// A single entry in the route table.
#[derive(Debug, Clone)]
pub struct RouteRule {
    /// Rule identifier for logs and metrics.
    pub name: &'static str,
    pub kind: MatchKind,
    pub action: RouteAction,
    /// Successful handling of this route is not access-logged.
    pub bypass_log: bool,
}

impl RouteRule {
    pub fn matches(&self, path: &str) -> bool {
        self.kind.matches(path)
    }
}

/// Build the gateway's fixed-priority rule list.
///
/// Priority order, highest first: favicon, dotfile deny, health probe,
/// static assets, websocket, detection API (prefix-stripped), dashboard API,
/// then the catch-all dashboard root.
pub fn standard_rules(config: &GatewayConfig) -> Vec<RouteRule> {
    let detection_timeout = Duration::from_secs(config.timeouts.detection_secs);
    let default_timeout = Duration::from_secs(config.timeouts.default_secs);

    vec![
        RouteRule {
            name: "favicon",
            kind: MatchKind::Exact("/favicon.ico"),
            action: RouteAction::NoContent,
            bypass_log: true,
        },
        RouteRule {
            name: "dotfile",
            kind: MatchKind::DotSegment,
            action: RouteAction::Deny,
            bypass_log: true,
        },
        RouteRule {
            name: "health",
            kind: MatchKind::Exact("/health"),
            action: RouteAction::Proxy(ProxyTarget {
                pool: "dashboard",
                strip_prefix: None,
                zone: None,
                upgrade_aware: false,
                request_timeout: Some(default_timeout),
            }),
            bypass_log: true,
        },
        RouteRule {
            name: "static",
            kind: MatchKind::Prefix("/static/"),
            action: RouteAction::Static,
            bypass_log: true,
        },
        RouteRule {
            name: "websocket",
            kind: MatchKind::Prefix("/ws"),
            action: RouteAction::Proxy(ProxyTarget {
                pool: "dashboard",
                strip_prefix: None,
                zone: None,
                upgrade_aware: true,
                request_timeout: None,
            }),
            bypass_log: false,
        },
        RouteRule {
            name: "detection_api",
            kind: MatchKind::SegmentPrefix("/api/detection"),
            action: RouteAction::Proxy(ProxyTarget {
                pool: "detection",
                strip_prefix: Some("/api/detection"),
                zone: Some(ZoneRef { name: "api", burst: 20 }),
                upgrade_aware: false,
                request_timeout: Some(detection_timeout),
            }),
            bypass_log: false,
        },
        RouteRule {
            name: "dashboard_api",
            kind: MatchKind::Prefix("/api/"),
            action: RouteAction::Proxy(ProxyTarget {
                pool: "dashboard",
                strip_prefix: None,
                zone: Some(ZoneRef { name: "api", burst: 15 }),
                upgrade_aware: false,
                request_timeout: Some(default_timeout),
            }),
            bypass_log: false,
        },
    ]
}

/// The catch-all rule applied when nothing above matched.
pub fn default_rule(config: &GatewayConfig) -> RouteRule {
    RouteRule {
        name: "dashboard_root",
        kind: MatchKind::Prefix("/"),
        action: RouteAction::Proxy(ProxyTarget {
            pool: "dashboard",
            strip_prefix: None,
            zone: Some(ZoneRef {
                name: "dashboard",
                burst: 10,
            }),
            upgrade_aware: true,
            request_timeout: Some(Duration::from_secs(config.timeouts.default_secs)),
        }),
        bypass_log: false,
    }
}
