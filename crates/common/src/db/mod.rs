//! Database layer for ContractForge
//!
//! Provides:
//! - SeaORM entity models
//! - The `ContractStore` seam with Postgres and in-memory implementations
//! - Connection pool management and schema bootstrap

mod memory;
pub mod models;
mod repository;
mod store;

pub use memory::MemoryStore;
pub use repository::Repository;
pub use store::{AnalyzedDocument, ChunkMatch, ContractStore, NewChunk, NewDocument};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use std::time::Duration;
use tracing::info;

const SCHEMA: &str = include_str!("../../migrations/0001_init.sql");

/// Primary connection plus an optional read replica
pub struct DbPool {
    pub primary: DatabaseConnection,
    pub replica: Option<DatabaseConnection>,
}

async fn connect(url: &str, config: &DatabaseConfig, role: &str) -> Result<DatabaseConnection> {
    let mut options = ConnectOptions::new(url);
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .sqlx_logging(false);

    Database::connect(options)
        .await
        .map_err(|e| AppError::DatabaseConnection {
            message: format!("Failed to connect to {}: {}", role, e),
        })
}

impl DbPool {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let primary = connect(&config.url, config, "primary").await?;
        let replica = match config.read_url.as_deref() {
            Some(url) => Some(connect(url, config, "replica").await?),
            None => None,
        };

        info!(replica = replica.is_some(), "Database connections established");
        Ok(Self { primary, replica })
    }

    /// Replica when configured, otherwise primary
    pub fn read(&self) -> &DatabaseConnection {
        self.replica.as_ref().unwrap_or(&self.primary)
    }

    pub fn write(&self) -> &DatabaseConnection {
        &self.primary
    }

    /// Apply the bundled schema; every statement is idempotent
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Applying database schema");

        self.primary
            .execute_unprepared(SCHEMA)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Schema migration failed: {}", e),
            })?;

        Ok(())
    }

    /// `SELECT 1` against every connection
    pub async fn ping(&self) -> Result<()> {
        for (role, conn) in std::iter::once(("primary", &self.primary))
            .chain(self.replica.as_ref().map(|r| ("replica", r)))
        {
            conn.execute_unprepared("SELECT 1")
                .await
                .map_err(|e| AppError::DatabaseConnection {
                    message: format!("{} ping failed: {}", role, e),
                })?;
        }
        Ok(())
    }
}
