//! First-start seeding.
//!
//! # Responsibilities
//! - Load `*.sql` init scripts from a directory, ordered by file name
//! - Apply each script exactly once over the lifetime of the data volume
//!
//! # Design Decisions
//! - Applied script names are recorded in `stack_seed_history`
//! - A script and its ledger row commit in one transaction, so a failed
//!   script is retried on the next start instead of being half-recorded

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::persistence::{PersistenceError, Store};

const LEDGER_DDL: &str = "CREATE TABLE IF NOT EXISTS stack_seed_history (name TEXT PRIMARY KEY)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedScript {
    pub name: String,
    pub sql: String,
}

impl SeedScript {
    /// Load every `*.sql` file in `dir`, sorted by file name.
    pub fn load_dir(dir: &Path) -> Result<Vec<Self>, PersistenceError> {
        let io_err = |source| PersistenceError::Seed {
            path: dir.to_path_buf(),
            source,
        };

        let mut scripts = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("sql") {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let sql = fs::read_to_string(&path).map_err(|source| PersistenceError::Seed {
                path: path.clone(),
                source,
            })?;
            scripts.push(SeedScript {
                name: name.to_string(),
                sql,
            });
        }

        scripts.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(scripts)
    }
}

/// What a seeding run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedOutcome {
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Seeder {
    scripts: Vec<SeedScript>,
}

impl Seeder {
    pub fn new(scripts: Vec<SeedScript>) -> Self {
        Self { scripts }
    }

    pub fn from_dir(dir: &Path) -> Result<Self, PersistenceError> {
        SeedScript::load_dir(dir).map(Self::new)
    }

    /// Apply every script not yet recorded in the ledger.
    pub async fn run(&self, store: &Store) -> Result<SeedOutcome, PersistenceError> {
        let pool = store.pool();
        sqlx::query(LEDGER_DDL).execute(pool).await?;

        let applied: HashSet<String> =
            sqlx::query_scalar::<_, String>("SELECT name FROM stack_seed_history")
                .fetch_all(pool)
            .await?
            .into_iter()
            .collect();

        let mut outcome = SeedOutcome::default();
        for script in &self.scripts {
            if applied.contains(&script.name) {
                tracing::debug!(script = %script.name, "Seed script already applied");
                outcome.skipped.push(script.name.clone());
                continue;
            }

            let mut tx = pool.begin().await?;
            sqlx::raw_sql(&script.sql)
                .execute(&mut *tx)
                .await
                .map_err(|source| PersistenceError::Script {
                    name: script.name.clone(),
                    source,
                })?;
            sqlx::query("INSERT INTO stack_seed_history (name) VALUES ($1)")
                .bind(&script.name)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            tracing::info!(script = %script.name, "Seed script applied");
            outcome.applied.push(script.name.clone());
        }

        Ok(outcome)
    }
}
