//! Mode-dependent service composition.
//!
//! Resolves, once per deployment, which frontend implementation is active
//! and how the API process is supervised. The API's external contract
//! (endpoint and path prefix) is the same in both modes.

use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;

use crate::composition::DeploymentMode;
use crate::config::{ServiceEndpoint, StackConfig};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompositionError {
    #[error("no API endpoint configured")]
    MissingApi,

    #[error("development mode requires a frontend dev server endpoint")]
    MissingDevServer,
}

/// The active frontend implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrontendUnit {
    /// A live-reloading asset server, reached through the router.
    LiveReload { endpoint: ServiceEndpoint },
    /// A static asset tree produced by a prior build step.
    StaticBundle { root: PathBuf, index_document: String },
}

/// How the API process is supervised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Supervision {
    /// Restart whenever a watched source path changes.
    RestartOnChange {
        watch: Vec<PathBuf>,
        #[serde(with = "millis")]
        debounce: Duration,
    },
    /// Run the process once; no restarts.
    Once,
}

impl Supervision {
    /// Strategy for `config.mode`. Needs no endpoints, so the API's own
    /// container can resolve it.
    pub fn for_config(config: &StackConfig) -> Self {
        match config.mode {
            DeploymentMode::Development => Supervision::RestartOnChange {
                watch: config.supervisor.watch.clone(),
                debounce: Duration::from_millis(config.supervisor.debounce_ms),
            },
            DeploymentMode::Production => Supervision::Once,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceRole {
    EdgeRouter,
    Api,
    Frontend,
    Database,
}

/// Condition a dependent service waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyCondition {
    /// The dependency's readiness probe passes.
    Healthy,
    /// The dependency's process has started.
    Started,
    /// The dependency ran to completion (build steps).
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dependency {
    pub service: String,
    pub condition: ReadyCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    UnlessStopped,
    No,
}

/// One service in the resolved composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServicePlan {
    pub name: String,
    pub role: ServiceRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<ServiceEndpoint>,
    /// Reachable from outside the internal network.
    pub exposed: bool,
    /// A long-running process (false for one-shot build steps).
    pub long_running: bool,
    pub depends_on: Vec<Dependency>,
    pub restart: RestartPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<PathBuf>,
}

/// The composition selected for one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Composition {
    pub mode: DeploymentMode,
    pub api: ServiceEndpoint,
    pub api_prefix: String,
    pub frontend: FrontendUnit,
    pub supervision: Supervision,
}

impl Composition {
    /// Resolve the composition for `config.mode`.
    pub fn resolve(config: &StackConfig) -> Result<Self, CompositionError> {
        let api = config.api.clone().ok_or(CompositionError::MissingApi)?;

        let frontend = match config.mode {
            DeploymentMode::Development => FrontendUnit::LiveReload {
                endpoint: config
                    .frontend
                    .dev_server
                    .clone()
                    .ok_or(CompositionError::MissingDevServer)?,
            },
            DeploymentMode::Production => FrontendUnit::StaticBundle {
                root: config.frontend.static_root.clone(),
                index_document: config.frontend.index_document.clone(),
            },
        };

        Ok(Self {
            mode: config.mode,
            api,
            api_prefix: config.routing.api_prefix.clone(),
            frontend,
            supervision: Supervision::for_config(config),
        })
    }

    /// Describe every service of the deployment.
    pub fn plan(&self, config: &StackConfig) -> Vec<ServicePlan> {
        let database = ServicePlan {
            name: "database".to_string(),
            role: ServiceRole::Database,
            endpoint: config
                .database
                .host
                .as_ref()
                .map(|host| ServiceEndpoint::new("database", host.clone(), config.database.port)),
            exposed: false,
            long_running: true,
            depends_on: Vec::new(),
            restart: RestartPolicy::UnlessStopped,
            volume: config.database.volume_path.clone(),
        };

        let api = ServicePlan {
            name: self.api.name.clone(),
            role: ServiceRole::Api,
            endpoint: Some(self.api.clone()),
            exposed: false,
            long_running: true,
            depends_on: vec![Dependency {
                service: database.name.clone(),
                condition: ReadyCondition::Healthy,
            }],
            restart: RestartPolicy::UnlessStopped,
            volume: None,
        };

        let frontend = match &self.frontend {
            FrontendUnit::LiveReload { endpoint } => ServicePlan {
                name: endpoint.name.clone(),
                role: ServiceRole::Frontend,
                endpoint: Some(endpoint.clone()),
                exposed: false,
                long_running: true,
                depends_on: Vec::new(),
                restart: RestartPolicy::UnlessStopped,
                volume: None,
            },
            // Build output is handed to the router; the builder does not keep running.
            FrontendUnit::StaticBundle { .. } => ServicePlan {
                name: "frontend-build".to_string(),
                role: ServiceRole::Frontend,
                endpoint: None,
                exposed: false,
                long_running: false,
                depends_on: Vec::new(),
                restart: RestartPolicy::No,
                volume: None,
            },
        };

        let router_dependency = match self.frontend {
            FrontendUnit::LiveReload { .. } => ReadyCondition::Started,
            FrontendUnit::StaticBundle { .. } => ReadyCondition::Completed,
        };
        let router = ServicePlan {
            name: "edge-router".to_string(),
            role: ServiceRole::EdgeRouter,
            endpoint: None,
            exposed: true,
            long_running: true,
            depends_on: vec![
                Dependency {
                    service: api.name.clone(),
                    condition: ReadyCondition::Started,
                },
                Dependency {
                    service: frontend.name.clone(),
                    condition: router_dependency,
                },
            ],
            restart: RestartPolicy::UnlessStopped,
            volume: None,
        };

        vec![database, api, frontend, router]
    }
}

mod millis {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}
