//! State cache for cardsync
//!
//! Remembers which issues have been synced, under which relationship, and
//! which cards were written for them. The sync engine reads it to choose
//! between create and update policies and to pick the close policy of an
//! archived card group.

pub mod error;
mod ledger;

use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

pub use error::{Error, Result};
pub use ledger::SqliteLedger;

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create the database at `db_path` and run migrations
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true);

        // Writes are sequential; one connection keeps them ordered
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        debug!(path = %db_path.display(), "Opened state cache");

        Ok(Self { pool })
    }

    /// Get the default database path (~/.cache/cardsync/state.db)
    pub fn default_path() -> Result<PathBuf> {
        cardsync_core::config::default_state_db_path()
            .ok_or_else(|| Error::InvalidData("Could not determine cache directory".to_string()))
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get the sync ledger backed by this database
    pub fn ledger(&self) -> SqliteLedger {
        SqliteLedger::new(self.pool.clone())
    }
}
