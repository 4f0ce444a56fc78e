//! Readiness gate.
//!
//! # Responsibilities
//! - Block until a probe passes
//! - Retry with exponential backoff and jitter
//! - Give up after a bounded total wait
//!
//! # Design Decisions
//! - Never a fixed sleep: the first attempt runs immediately
//! - Every attempt has its own timeout
//! - The last failure is reported when the gate gives up

use std::time::{Duration, Instant};

use crate::config::ReadinessConfig;
use crate::http::proxy::{build_client, HttpClient};
use crate::observability::metrics;
use crate::readiness::probe::{Probe, ProbeError};
use crate::resilience::Backoff;

#[derive(Debug, thiserror::Error)]
pub enum ReadinessError {
    #[error("{target} not ready after {attempts} attempts in {elapsed:?}: {last_error}")]
    TimedOut {
        target: String,
        attempts: u32,
        elapsed: Duration,
        last_error: ProbeError,
    },
}

/// Outcome of a successful wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ready {
    pub attempts: u32,
    pub elapsed: Duration,
}

#[derive(Clone)]
pub struct ReadinessGate {
    max_wait: Duration,
    probe_timeout: Duration,
    backoff: Backoff,
    client: HttpClient,
}

impl ReadinessGate {
    pub fn new(config: &ReadinessConfig) -> Self {
        let probe_timeout = Duration::from_secs(config.probe_timeout_secs);
        Self {
            max_wait: Duration::from_secs(config.max_wait_secs),
            probe_timeout,
            backoff: Backoff::from_millis(config.base_delay_ms, config.max_delay_ms),
            client: build_client(probe_timeout),
        }
    }

    /// Override the total wait bound.
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Block until `probe` passes or the wait bound is exhausted.
    pub async fn wait(&self, probe: &Probe) -> Result<Ready, ReadinessError> {
        let target = probe.label();
        let start = Instant::now();
        let deadline = start + self.max_wait;

        tracing::info!(target = %target, max_wait = ?self.max_wait, "Waiting for dependency");

        let mut attempts = 0;
        loop {
            attempts += 1;
            let attempt = probe.check(&self.client);
            let result = match tokio::time::timeout(self.probe_timeout, attempt).await {
                Ok(result) => result,
                Err(_) => Err(ProbeError::Timeout),
            };
            metrics::record_readiness_attempt(&target, result.is_ok());

            let error = match result {
                Ok(()) => {
                    let elapsed = start.elapsed();
                    tracing::info!(
                        target = %target,
                        attempts,
                        elapsed = ?elapsed,
                        "Dependency ready"
                    );
                    return Ok(Ready { attempts, elapsed });
                }
                Err(e) => e,
            };

            let now = Instant::now();
            if now >= deadline {
                tracing::error!(
                    target = %target,
                    attempts,
                    error = %error,
                    "Dependency never became ready"
                );
                return Err(ReadinessError::TimedOut {
                    target,
                    attempts,
                    elapsed: start.elapsed(),
                    last_error: error,
                });
            }

            let delay = self.backoff.delay(attempts).min(deadline - now);
            tracing::debug!(
                target = %target,
                attempt = attempts,
                delay = ?delay,
                error = %error,
                "Dependency not ready"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn fast_gate(max_wait: Duration) -> ReadinessGate {
        ReadinessGate::new(&ReadinessConfig {
            max_wait_secs: 1,
            base_delay_ms: 20,
            max_delay_ms: 100,
            probe_timeout_secs: 1,
        })
        .with_max_wait(max_wait)
    }

    #[tokio::test]
    async fn passes_immediately_when_listening() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let probe = Probe::Tcp {
            authority: listener.local_addr().unwrap().to_string(),
        };

        let ready = fast_gate(Duration::from_secs(1)).wait(&probe).await.unwrap();
        assert_eq!(ready.attempts, 1);
    }

    #[tokio::test]
    async fn waits_for_late_dependency() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let late = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            let listener = TcpListener::bind(addr).await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(listener);
        });

        let probe = Probe::Tcp {
            authority: addr.to_string(),
        };
        let ready = fast_gate(Duration::from_secs(5)).wait(&probe).await.unwrap();
        assert!(ready.attempts > 1);
        assert!(ready.elapsed >= Duration::from_millis(250));

        late.abort();
    }

    #[tokio::test]
    async fn gives_up_after_max_wait() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let probe = Probe::Tcp {
            authority: addr.to_string(),
        };

        let start = Instant::now();
        let err = fast_gate(Duration::from_millis(500)).wait(&probe).await.unwrap_err();
        let ReadinessError::TimedOut { attempts, .. } = err;

        assert!(attempts > 1);
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn database_probe_opens_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let probe = Probe::Database {
            url: format!("sqlite://{}?mode=rwc", dir.path().join("ready.db").display()),
        };
        assert!(fast_gate(Duration::from_secs(2)).wait(&probe).await.is_ok());
    }
}
