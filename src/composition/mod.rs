//! Environment/composition switch.
//!
//! # Data Flow
//! ```text
//! StackConfig (mode + named settings)
//!     → mode.rs (DeploymentMode, fixed for the process)
//!     → plan.rs (Composition::resolve)
//!         - FrontendUnit: LiveReload | StaticBundle
//!         - Supervision:  RestartOnChange | Once
//!     → edge router rule set, API supervisor, `plan` output
//! ```
//!
//! # Design Decisions
//! - Selected once at startup; never branched on per request
//! - Only the router is exposed outside the internal network

pub mod mode;
pub mod plan;

pub use mode::DeploymentMode;
pub use plan::{
    Composition, CompositionError, Dependency, FrontendUnit, ReadyCondition, RestartPolicy,
    ServicePlan, ServiceRole, Supervision,
};
