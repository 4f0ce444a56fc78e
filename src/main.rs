//! Edge router (v1)
//!
//! Single entry point of a three-tier web stack: the only exposed service.
//!
//! # Architecture Overview
//!
//! ```text
//!                           ┌──────────────────────────────────────┐
//!                           │             EDGE ROUTER              │
//!     Client Request        │  ┌──────────┐    ┌──────────────┐    │
//!     ──────────────────────┼─▶│   http   │───▶│ route table  │    │
//!                           │  │  server  │    │ (per mode)   │    │
//!                           │  └──────────┘    └──────┬───────┘    │
//!                           │           ┌─────────────┼──────┐     │
//!                           │           ▼             ▼      ▼     │
//!                           │      ┌────────┐  ┌─────────┐ ┌─────┐ │
//!                           │      │  api   │  │frontend │ │static│ │
//!                           │      │upstream│  │dev srv  │ │files │ │
//!                           │      └───┬────┘  └────┬────┘ └─────┘ │
//!                           └──────────┼────────────┼──────────────┘
//!                                      ▼            ▼
//!                                  API service   Dev server   (development)
//!                                      │
//!                                      ▼
//!                                  Database (durable volume)
//! ```
//!
//! The same binary also gates dependents on readiness (`wait-for`),
//! supervises the API process (`supervise`), seeds the database (`seed`),
//! and prints the resolved composition (`plan`).

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

use edge_router::composition::{Composition, Supervision};
use edge_router::config::{load_config, Component, ConfigSources, ObservabilityConfig, StackConfig};
use edge_router::observability::{logging, metrics};
use edge_router::persistence::{DataVolume, Destroy, Seeder, Store};
use edge_router::readiness::{Probe, ReadinessGate};
use edge_router::routing::RouteTable;
use edge_router::supervisor::{Outcome, Supervisor};
use edge_router::{DeploymentMode, HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "edge-router")]
#[command(
    about = "Edge router and orchestration tooling for a three-tier web stack",
    long_about = None
)]
struct Cli {
    /// TOML configuration file; environment variables override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Dotenv file (defaults to ./.env when present).
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the edge router
    Serve,
    /// Print the resolved composition as JSON
    Plan,
    /// Block until a dependency is ready
    WaitFor {
        /// database, api, frontend, tcp://host:port or an http:// URL
        target: String,
        /// Override the maximum wait, in seconds
        #[arg(long)]
        max_wait: Option<u64>,
    },
    /// Run the API process under the mode's supervision strategy
    Supervise {
        /// Wait for this dependency before the first start
        #[arg(long)]
        wait_for: Option<String>,
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
    /// Apply database init scripts not yet applied
    Seed,
    /// Permanently delete the database volume
    DestroyVolume {
        /// Confirm that all stored data will be lost
        #[arg(long)]
        yes: bool,
    },
}

impl Commands {
    fn components(&self) -> &'static [Component] {
        match self {
            Commands::Serve => &[Component::Router],
            Commands::Plan | Commands::WaitFor { .. } | Commands::DestroyVolume { .. } => &[],
            Commands::Supervise { .. } => &[Component::Supervisor, Component::Database],
            Commands::Seed => &[Component::Database],
        }
    }
}

type BoxError = Box<dyn std::error::Error>;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let sources = ConfigSources {
        file: cli.config,
        env_file: cli.env_file,
    };

    // Fail before anything is bound or spawned.
    let config = match load_config(&sources, cli.command.components()) {
        Ok(config) => config,
        Err(e) => {
            logging::init(&ObservabilityConfig::default(), DeploymentMode::Development);
            tracing::error!(error = %e, "Configuration rejected, not starting");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability, config.mode);
    tracing::info!(mode = %config.mode, "edge-router v{} starting", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Serve => serve(&config).await,
        Commands::Plan => plan(&config),
        Commands::WaitFor { target, max_wait } => wait_for(&config, &target, max_wait).await,
        Commands::Supervise { wait_for, command } => {
            supervise(&config, wait_for.as_deref(), command).await
        }
        Commands::Seed => seed(&config).await,
        Commands::DestroyVolume { yes } => destroy_volume(&config, yes),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: &StackConfig) -> Result<ExitCode, BoxError> {
    let composition = Composition::resolve(config)?;
    let server = HttpServer::from_composition(&composition, config)?;

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?);
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    let shutdown = Shutdown::new(Duration::from_secs(config.shutdown.grace_period_secs));
    shutdown.trigger_on_signal();
    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(ExitCode::SUCCESS)
}

fn plan(config: &StackConfig) -> Result<ExitCode, BoxError> {
    let composition = Composition::resolve(config)?;
    let routes: Vec<_> = RouteTable::for_mode(composition.mode, &composition.api_prefix)?
        .rules()
        .iter()
        .map(|rule| serde_json::json!({ "prefix": rule.prefix(), "target": rule.target() }))
        .collect();

    let document = serde_json::json!({
        "composition": composition,
        "routes": routes,
        "services": composition.plan(config),
    });
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(ExitCode::SUCCESS)
}

async fn wait_for(
    config: &StackConfig,
    target: &str,
    max_wait: Option<u64>,
) -> Result<ExitCode, BoxError> {
    let probe = Probe::parse(target, config)?;
    let mut gate = ReadinessGate::new(&config.readiness);
    if let Some(secs) = max_wait {
        gate = gate.with_max_wait(Duration::from_secs(secs));
    }
    gate.wait(&probe).await?;
    Ok(ExitCode::SUCCESS)
}

async fn supervise(
    config: &StackConfig,
    dependency: Option<&str>,
    command: Vec<String>,
) -> Result<ExitCode, BoxError> {
    let shutdown = Shutdown::new(Duration::from_secs(config.shutdown.grace_period_secs));
    let supervisor = Supervisor::new(
        command,
        Supervision::for_config(config),
        shutdown.grace_period(),
    )?;

    shutdown.trigger_on_signal();
    let mut stop = shutdown.subscribe();

    if let Some(target) = dependency {
        let probe = Probe::parse(target, config)?;
        let gate = ReadinessGate::new(&config.readiness);
        tokio::select! {
            ready = gate.wait(&probe) => { ready?; }
            _ = stop.recv() => return Ok(ExitCode::SUCCESS),
        }
    }

    match supervisor.run(shutdown.subscribe()).await? {
        Outcome::Exited(status) if status.success() => Ok(ExitCode::SUCCESS),
        Outcome::Exited(status) => {
            let code = status.code().and_then(|c| u8::try_from(c).ok()).unwrap_or(1);
            Ok(ExitCode::from(code))
        }
        Outcome::Stopped => Ok(ExitCode::SUCCESS),
    }
}

async fn seed(config: &StackConfig) -> Result<ExitCode, BoxError> {
    let Some(init_dir) = &config.database.init_dir else {
        tracing::info!("No DB_INIT_DIR configured, nothing to seed");
        return Ok(ExitCode::SUCCESS);
    };
    let seeder = Seeder::from_dir(init_dir)?;

    if let Some(path) = &config.database.volume_path {
        DataVolume::open(path)?;
    }

    let url = config
        .database
        .connection_url()
        .ok_or("database connection settings are incomplete")?;
    let store = Store::connect(&url).await?;
    let outcome = seeder.run(&store).await;
    store.close().await;
    let outcome = outcome?;

    tracing::info!(
        applied = outcome.applied.len(),
        skipped = outcome.skipped.len(),
        "Seeding complete"
    );
    Ok(ExitCode::SUCCESS)
}

fn destroy_volume(config: &StackConfig, confirmed: bool) -> Result<ExitCode, BoxError> {
    let path = config
        .database
        .volume_path
        .as_ref()
        .ok_or("DB_VOLUME_PATH is not configured")?;

    if !path.exists() {
        tracing::info!(path = %path.display(), "Data volume already absent");
        return Ok(ExitCode::SUCCESS);
    }

    DataVolume::open(path)?.destroy(Destroy::from(confirmed))?;
    Ok(ExitCode::SUCCESS)
}
