//! Configuration loading from disk and environment.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::env::apply_env;
use crate::config::schema::StackConfig;
use crate::config::validation::{validate_config, Component, ValidationError};

/// Dotenv file picked up from the working directory when none is given.
pub const DEFAULT_ENV_FILE: &str = ".env";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to read env file {}: {source}", .path.display())]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("configuration rejected: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Where to read configuration from.
#[derive(Debug, Clone, Default)]
pub struct ConfigSources {
    /// Optional TOML file.
    pub file: Option<PathBuf>,
    /// Optional dotenv file; falls back to `.env` when present.
    pub env_file: Option<PathBuf>,
}

impl ConfigSources {
    fn resolved_env_file(&self) -> Option<PathBuf> {
        self.env_file.clone().or_else(|| {
            let default = PathBuf::from(DEFAULT_ENV_FILE);
            default.is_file().then_some(default)
        })
    }
}

/// Load configuration, apply the process environment, and validate it for
/// the given components.
pub fn load_config(
    sources: &ConfigSources,
    components: &[Component],
) -> Result<StackConfig, ConfigError> {
    let mut vars = match sources.resolved_env_file() {
        Some(path) => read_env_file(&path)?,
        None => HashMap::new(),
    };
    // The process environment wins over the dotenv file.
    vars.extend(std::env::vars());

    load_with_vars(sources.file.as_deref(), &vars, components)
}

/// Load configuration from an optional TOML file and an explicit set of
/// environment variables.
pub fn load_with_vars(
    file: Option<&Path>,
    vars: &HashMap<String, String>,
    components: &[Component],
) -> Result<StackConfig, ConfigError> {
    let mut config = match file {
        Some(path) => read_toml(path)?,
        None => StackConfig::default(),
    };

    apply_env(&mut config, vars)?;
    validate_config(&config, components).map_err(ConfigError::Validation)?;

    Ok(config)
}

fn read_toml(path: &Path) -> Result<StackConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let to_err = |source| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source,
    };

    let mut vars = HashMap::new();
    for item in dotenvy::from_path_iter(path).map_err(to_err)? {
        let (key, value) = item.map_err(to_err)?;
        vars.insert(key, value);
    }
    Ok(vars)
}
