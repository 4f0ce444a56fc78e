//! Edge router HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → routing::RouteTable (longest prefix)
//!     → proxy.rs   (API / dev server: forward, headers.rs, upgrade.rs)
//!       | static_files.rs (production: file or index document)
//!     → response.rs (gateway failures)
//!     → Send to client
//! ```

pub mod headers;
pub mod proxy;
pub mod request;
pub mod response;
pub mod server;
pub mod static_files;
pub mod upgrade;

pub use request::X_REQUEST_ID;
pub use response::GatewayError;
pub use server::{HttpServer, ServerError};
