//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes for one deployment mode
//! - Look up the matching route for a request path
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) path prefix scan (the table holds a handful of rules)
//! - Construction fails if a catch-all is missing or a prefix repeats, so
//!   lookup is total

use std::fmt;

use serde::Serialize;

use crate::composition::DeploymentMode;
use crate::routing::matcher::PathPrefixMatcher;

const BOTH: &[DeploymentMode] = &[DeploymentMode::Development, DeploymentMode::Production];
const DEV_ONLY: &[DeploymentMode] = &[DeploymentMode::Development];
const PROD_ONLY: &[DeploymentMode] = &[DeploymentMode::Production];

/// What a route forwards to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteTarget {
    /// The API service.
    Api,
    /// The live-reload frontend server (development).
    FrontendDevServer,
    /// The prebuilt static asset tree (production).
    StaticAssets,
}

impl RouteTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteTarget::Api => "api",
            RouteTarget::FrontendDevServer => "frontend",
            RouteTarget::StaticAssets => "static",
        }
    }
}

impl fmt::Display for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    #[error("route table has no '/' catch-all rule")]
    NoCatchAll,

    #[error("prefix '{0}' is declared more than once")]
    DuplicatePrefix(String),
}

/// A single routing rule.
#[derive(Debug, Clone)]
pub struct RouteRule<T> {
    matcher: PathPrefixMatcher,
    target: T,
}

impl<T> RouteRule<T> {
    pub fn new(prefix: impl Into<String>, target: T) -> Self {
        Self {
            matcher: PathPrefixMatcher::new(prefix),
            target,
        }
    }

    pub fn prefix(&self) -> &str {
        self.matcher.prefix()
    }

    pub fn target(&self) -> &T {
        &self.target
    }
}

/// Immutable, mode-specific routing table.
#[derive(Debug, Clone)]
pub struct RouteTable<T> {
    /// Sorted by prefix length, longest first; the catch-all is last.
    rules: Vec<RouteRule<T>>,
}

impl RouteTable<RouteTarget> {
    /// The full declared rule set with each rule's mode applicability.
    pub fn declared(api_prefix: &str) -> Vec<(RouteRule<RouteTarget>, &'static [DeploymentMode])> {
        vec![
            (RouteRule::new(api_prefix, RouteTarget::Api), BOTH),
            (RouteRule::new("/", RouteTarget::FrontendDevServer), DEV_ONLY),
            (RouteRule::new("/", RouteTarget::StaticAssets), PROD_ONLY),
        ]
    }

    /// Build the active rule set for `mode`.
    pub fn for_mode(mode: DeploymentMode, api_prefix: &str) -> Result<Self, RoutingError> {
        let rules = Self::declared(api_prefix)
            .into_iter()
            .filter(|(_, modes)| modes.contains(&mode))
            .map(|(rule, _)| rule)
            .collect();
        Self::new(rules)
    }
}

impl<T> RouteTable<T> {
    /// Compile a table from rules in any order.
    pub fn new(mut rules: Vec<RouteRule<T>>) -> Result<Self, RoutingError> {
        for (i, rule) in rules.iter().enumerate() {
            if rules[..i].iter().any(|r| r.prefix() == rule.prefix()) {
                return Err(RoutingError::DuplicatePrefix(rule.prefix().to_string()));
            }
        }
        if !rules.iter().any(|r| r.prefix() == "/") {
            return Err(RoutingError::NoCatchAll);
        }

        // Stable sort keeps declaration order among equal lengths.
        rules.sort_by(|a, b| b.matcher.specificity().cmp(&a.matcher.specificity()));
        Ok(Self { rules })
    }

    /// Return the rule for `path`: the longest matching prefix.
    pub fn resolve(&self, path: &str) -> &RouteRule<T> {
        let catch_all = &self.rules[self.rules.len() - 1];
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(path))
            .unwrap_or(catch_all)
    }

    pub fn rules(&self) -> &[RouteRule<T>] {
        &self.rules
    }

    /// Replace each rule's target, keeping prefixes and order.
    pub fn try_map<U, E>(self, mut f: impl FnMut(T) -> Result<U, E>) -> Result<RouteTable<U>, E> {
        let rules = self
            .rules
            .into_iter()
            .map(|rule| {
                Ok(RouteRule {
                    matcher: rule.matcher,
                    target: f(rule.target)?,
                })
            })
            .collect::<Result<Vec<_>, E>>()?;
        Ok(RouteTable { rules })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_routes_api_and_dev_server() {
        let table = RouteTable::for_mode(DeploymentMode::Development, "/api").unwrap();
        assert_eq!(*table.resolve("/api/users").target(), RouteTarget::Api);
        assert_eq!(*table.resolve("/api").target(), RouteTarget::Api);
        assert_eq!(*table.resolve("/").target(), RouteTarget::FrontendDevServer);
        assert_eq!(*table.resolve("/apiary").target(), RouteTarget::FrontendDevServer);
        assert_eq!(*table.resolve("/@vite/client").target(), RouteTarget::FrontendDevServer);
    }

    #[test]
    fn production_routes_api_and_static() {
        let table = RouteTable::for_mode(DeploymentMode::Production, "/api").unwrap();
        assert_eq!(*table.resolve("/api/health").target(), RouteTarget::Api);
        assert_eq!(*table.resolve("/dashboard/settings").target(), RouteTarget::StaticAssets);
        assert!(table.rules().iter().all(|r| *r.target() != RouteTarget::FrontendDevServer));
    }

    #[test]
    fn mode_is_the_only_input_changing_targets() {
        let dev = RouteTable::for_mode(DeploymentMode::Development, "/api").unwrap();
        let prod = RouteTable::for_mode(DeploymentMode::Production, "/api").unwrap();
        for path in ["/", "/index.html", "/api", "/api/x", "/app/route"] {
            let first = *dev.resolve(path).target();
            for _ in 0..10 {
                assert_eq!(*dev.resolve(path).target(), first);
            }
            let api = first == RouteTarget::Api;
            assert_eq!(*prod.resolve(path).target() == RouteTarget::Api, api);
        }
    }

    #[test]
    fn longest_prefix_wins_regardless_of_declaration_order() {
        let table = RouteTable::new(vec![
            RouteRule::new("/", "root"),
            RouteRule::new("/api", "api"),
            RouteRule::new("/api/admin", "admin"),
        ])
        .unwrap();
        assert_eq!(*table.resolve("/api/admin/users").target(), "admin");
        assert_eq!(*table.resolve("/api/users").target(), "api");
        assert_eq!(*table.resolve("/about").target(), "root");
    }

    #[test]
    fn rejects_tables_without_total_coverage() {
        let err = RouteTable::new(vec![RouteRule::new("/api", ())]).unwrap_err();
        assert_eq!(err, RoutingError::NoCatchAll);

        let rules = vec![RouteRule::new("/", 1), RouteRule::new("/", 2)];
        let err = RouteTable::new(rules).unwrap_err();
        assert_eq!(err, RoutingError::DuplicatePrefix("/".into()));
    }

    #[test]
    fn try_map_keeps_order() {
        let table = RouteTable::for_mode(DeploymentMode::Production, "/api").unwrap();
        let mapped = table
            .try_map(|t| Ok::<_, ()>(t.as_str().to_uppercase()))
            .unwrap();
        assert_eq!(mapped.resolve("/api/x").target(), "API");
        assert_eq!(mapped.resolve("/x").target(), "STATIC");
    }
}
