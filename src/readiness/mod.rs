//! Readiness gating.
//!
//! # Data Flow
//! ```text
//! wait-for target / supervise --wait-for
//!     → probe.rs (Tcp | Http | Database)
//!     → gate.rs  (attempt, backoff, repeat until ready or max wait)
//!     → Ready → dependent process starts
//!     → TimedOut → non-zero exit, dependent never starts
//! ```

pub mod gate;
pub mod probe;

pub use gate::{ReadinessError, Ready, ReadinessGate};
pub use probe::{Probe, ProbeError};
