//! Shutdown coordination.

use std::time::Duration;

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Long-running tasks subscribe to a broadcast channel; triggering it asks
/// every subscriber to stop. Each subscriber bounds its own drain by the
/// grace period.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
    grace_period: Duration,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new(grace_period: Duration) -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx, grace_period }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Time allowed for in-flight work to finish after the trigger.
    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Trigger shutdown when the process receives a termination signal.
    pub fn trigger_on_signal(&self) {
        let shutdown = self.clone();
        tokio::spawn(async move {
            crate::lifecycle::signals::wait_for_termination().await;
            shutdown.trigger();
        });
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}
