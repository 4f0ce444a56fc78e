//! Database persistence.
//!
//! # Data Flow
//! ```text
//! DataVolume::open (durable directory, created once)
//!     → Store::connect (postgres:// or sqlite:// pool)
//!     → Seeder::run (init scripts, each applied once)
//!     → Store::close (ordinary shutdown, data kept)
//!
//! destroy-volume --yes → DataVolume::destroy (only removal path)
//! ```

use std::path::PathBuf;

pub mod seed;
pub mod store;
pub mod volume;

pub use seed::{SeedOutcome, SeedScript, Seeder};
pub use store::Store;
pub use volume::{DataVolume, Destroy};

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("data volume {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("data volume {}: {source}", .path.display())]
    Volume {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("refusing to destroy {} without confirmation", .0.display())]
    DestroyNotConfirmed(PathBuf),

    #[error("failed to read seed scripts from {}: {source}", .path.display())]
    Seed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("seed script {name} failed: {source}")]
    Script { name: String, source: sqlx::Error },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
