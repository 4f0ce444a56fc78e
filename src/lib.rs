//! Edge router and stack orchestration library.

pub mod composition;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod persistence;
pub mod readiness;
pub mod resilience;
pub mod routing;
pub mod supervisor;

pub use composition::{Composition, DeploymentMode};
pub use config::StackConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
