//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → .env file + process environment
//!     → env.rs (named overrides)
//!     → validation.rs (semantic checks, per component)
//!     → StackConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the mode cannot change at runtime
//! - All fields have defaults to allow minimal configs, except settings
//!   that would be insecure to default (database credentials)
//! - The environment is read once, at startup, and never mid-request
//! - Validation separates syntactic (serde) from semantic checks

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, ConfigSources};
pub use schema::{
    DatabaseConfig, FrontendConfig, ListenerConfig, LogFormat, ObservabilityConfig, ReadinessConfig,
    RoutingConfig, ServiceEndpoint, ShutdownConfig, StackConfig, SupervisorConfig, TimeoutConfig,
};
pub use validation::{Component, ValidationError};
