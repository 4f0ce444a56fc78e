//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path)
//!     → table.rs (route lookup)
//!     → matcher.rs (evaluate prefix)
//!     → Return: the single matching RouteRule
//!
//! Route Compilation (at startup):
//!     declared rules (api prefix, catch-all per mode)
//!     → Filter by deployment mode
//!     → Sort by prefix length, longest first
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - Longest prefix wins; a `/` catch-all is always present, so every
//!   path matches exactly one rule

pub mod matcher;
pub mod table;

pub use matcher::PathPrefixMatcher;
pub use table::{RouteRule, RouteTable, RouteTarget, RoutingError};
