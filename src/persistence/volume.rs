//! Durable data volume.
//!
//! The volume outlives every process that uses it. Stopping the stack never
//! touches it; [`DataVolume::destroy`] is the only way to remove it.

use std::fs;
use std::path::{Path, PathBuf};

use crate::persistence::PersistenceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataVolume {
    path: PathBuf,
}

/// Explicit acknowledgement that a volume's data will be lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destroy {
    Confirmed,
    NotConfirmed,
}

impl From<bool> for Destroy {
    fn from(confirmed: bool) -> Self {
        if confirmed {
            Destroy::Confirmed
        } else {
            Destroy::NotConfirmed
        }
    }
}

impl DataVolume {
    /// Open the volume at `path`, creating it if missing.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let path = path.into();
        if path.exists() && !path.is_dir() {
            return Err(PersistenceError::NotADirectory(path));
        }
        fs::create_dir_all(&path).map_err(|source| PersistenceError::Volume {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "Data volume opened");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Connection URL for a SQLite database file kept inside the volume.
    pub fn sqlite_url(&self, file_name: &str) -> String {
        format!("sqlite://{}?mode=rwc", self.path.join(file_name).display())
    }

    /// Remove the volume and everything in it.
    pub fn destroy(self, confirmation: Destroy) -> Result<(), PersistenceError> {
        if confirmation != Destroy::Confirmed {
            return Err(PersistenceError::DestroyNotConfirmed(self.path));
        }
        fs::remove_dir_all(&self.path).map_err(|source| PersistenceError::Volume {
            path: self.path.clone(),
            source,
        })?;
        tracing::warn!(path = %self.path.display(), "Data volume destroyed");
        Ok(())
    }
}
