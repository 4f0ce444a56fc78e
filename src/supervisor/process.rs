//! API process supervision.
//!
//! # Responsibilities
//! - Spawn the API command
//! - Restart it after debounced source changes (development)
//! - Run it exactly once (production)
//! - Stop and reap it on shutdown
//!
//! # Design Decisions
//! - A crashed process is not respawned until the next source change
//! - Stop sends SIGTERM (unix), then kills once the grace period elapses

use std::path::PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::{broadcast, mpsc};

use crate::composition::Supervision;
use crate::supervisor::watch::SourceWatcher;

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("no command given")]
    EmptyCommand,

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("process I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to watch sources: {0}")]
    Watch(#[from] notify::Error),

    #[error("source watcher stopped unexpectedly")]
    WatcherClosed,
}

/// How a supervision run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The process ran to completion (single-run supervision).
    Exited(ExitStatus),
    /// Shutdown was requested and the process was stopped.
    Stopped,
}

enum Event {
    Exited(std::io::Result<ExitStatus>),
    Changed(Option<PathBuf>),
    Shutdown,
}

pub struct Supervisor {
    command: Vec<String>,
    strategy: Supervision,
    grace_period: Duration,
}

impl Supervisor {
    pub fn new(
        command: Vec<String>,
        strategy: Supervision,
        grace_period: Duration,
    ) -> Result<Self, SupervisorError> {
        if command.is_empty() {
            return Err(SupervisorError::EmptyCommand);
        }
        Ok(Self {
            command,
            strategy,
            grace_period,
        })
    }

    /// Supervise the command until it completes (single run) or `shutdown`
    /// fires.
    pub async fn run(
        &self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<Outcome, SupervisorError> {
        match &self.strategy {
            Supervision::Once => {
                let mut child = self.spawn()?;
                let event = tokio::select! {
                    status = child.wait() => Event::Exited(status),
                    _ = shutdown.recv() => Event::Shutdown,
                };

                match event {
                    Event::Exited(status) => {
                        let status = status?;
                        tracing::info!(status = %status, "API process exited");
                        Ok(Outcome::Exited(status))
                    }
                    _ => {
                        self.stop(child).await?;
                        Ok(Outcome::Stopped)
                    }
                }
            }
            Supervision::RestartOnChange { watch, debounce } => {
                let (watcher, changes) = SourceWatcher::new(watch.clone());
                let _watcher = watcher.run()?;
                self.restart_on_change(changes, *debounce, shutdown).await
            }
        }
    }

    async fn restart_on_change(
        &self,
        mut changes: mpsc::UnboundedReceiver<PathBuf>,
        debounce: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<Outcome, SupervisorError> {
        let mut child = Some(self.spawn()?);

        loop {
            let event = tokio::select! {
                status = wait_for(&mut child) => Event::Exited(status),
                change = changes.recv() => Event::Changed(change),
                _ = shutdown.recv() => Event::Shutdown,
            };

            match event {
                Event::Exited(status) => {
                    let status = status?;
                    child = None;
                    if status.success() {
                        tracing::info!("API process exited; waiting for a source change");
                    } else {
                        tracing::warn!(
                            status = %status,
                            "API process crashed; waiting for a source change"
                        );
                    }
                }
                Event::Changed(Some(path)) => {
                    settle(&mut changes, debounce).await;
                    tracing::info!(
                        path = %path.display(),
                        "Source change detected, restarting API process"
                    );
                    if let Some(running) = child.take() {
                        self.stop(running).await?;
                    }
                    child = Some(self.spawn()?);
                }
                Event::Changed(None) => {
                    if let Some(running) = child.take() {
                        self.stop(running).await?;
                    }
                    return Err(SupervisorError::WatcherClosed);
                }
                Event::Shutdown => {
                    if let Some(running) = child.take() {
                        self.stop(running).await?;
                    }
                    return Ok(Outcome::Stopped);
                }
            }
        }
    }

    fn spawn(&self) -> Result<Child, SupervisorError> {
        let (program, args) = self.command.split_first().ok_or(SupervisorError::EmptyCommand)?;
        let child = Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                program: program.clone(),
                source,
            })?;
        tracing::info!(program = %program, pid = ?child.id(), "API process started");
        Ok(child)
    }

    /// Ask the process to terminate, then kill it if it outlives the grace
    /// period. Always reaps.
    async fn stop(&self, mut child: Child) -> Result<(), SupervisorError> {
        if let Some(pid) = child.id() {
            request_termination(pid).await;
        }

        match tokio::time::timeout(self.grace_period, child.wait()).await {
            Ok(status) => {
                tracing::debug!(status = ?status, "API process stopped");
            }
            Err(_) => {
                tracing::warn!(
                    grace_period = ?self.grace_period,
                    "API process ignored termination, killing"
                );
                child.kill().await?;
            }
        }
        Ok(())
    }
}

async fn wait_for(child: &mut Option<Child>) -> std::io::Result<ExitStatus> {
    match child {
        Some(child) => child.wait().await,
        None => std::future::pending().await,
    }
}

/// Swallow further changes until none arrive for `quiet`.
async fn settle(changes: &mut mpsc::UnboundedReceiver<PathBuf>, quiet: Duration) {
    while let Ok(Some(_)) = tokio::time::timeout(quiet, changes.recv()).await {}
}

#[cfg(unix)]
async fn request_termination(pid: u32) {
    let sent = Command::new("kill")
        .arg("-TERM")
        .arg(pid.to_string())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false);
    if !sent {
        tracing::debug!(pid, "Could not deliver SIGTERM");
    }
}

#[cfg(not(unix))]
async fn request_termination(_pid: u32) {}
