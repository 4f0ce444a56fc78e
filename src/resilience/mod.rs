//! Resilience subsystem.
//!
//! # Design Decisions
//! - The edge router never retries; a failed upstream call is surfaced to
//!   the client as a gateway failure
//! - Backoff is used where waiting is the point: readiness gates
//! - Jittered backoff prevents thundering herd when several services wait
//!   on the same dependency

pub mod backoff;

pub use backoff::Backoff;
