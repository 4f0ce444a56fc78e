//! API process supervision.
//!
//! # Data Flow
//! ```text
//! development: spawn → source change → debounce → stop → spawn → ...
//! production:  spawn → exit (status propagated)
//! shutdown:    SIGTERM → grace period → kill → reap
//! ```

pub mod process;
pub mod watch;

pub use process::{Outcome, Supervisor, SupervisorError};
pub use watch::SourceWatcher;
