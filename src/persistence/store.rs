//! Database connection pool.

use std::time::Duration;

use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::AnyPool;

use crate::persistence::PersistenceError;

#[derive(Debug, Clone)]
pub struct Store {
    pool: AnyPool,
}

impl Store {
    /// Connect to a `postgres://` or `sqlite://` URL.
    pub async fn connect(url: &str) -> Result<Self, PersistenceError> {
        install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Close every connection. Data is left intact.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::debug!("Database connections closed");
    }
}
