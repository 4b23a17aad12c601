//! Database connection module for `ClickHouse`.
//!
//! Loads connection settings from the environment, checks connectivity and
//! provisions the three collections the analyzer writes to.

use anyhow::{Context, Result};
use clickhouse::Client;
use std::sync::Arc;

/// Default output database name.
pub const DEFAULT_DATABASE: &str = "bdstats";

/// Table definitions. Each table is a `ReplacingMergeTree` ordered by its
/// natural key, so re-inserting a key replaces the previous row.
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS logs (
        ts Int64,
        name String,
        log_type LowCardinality(String),
        total_size Int64,
        available_size Int64,
        reserved_size Int64,
        INDEX idx_name name TYPE bloom_filter GRANULARITY 4,
        INDEX idx_total_size total_size TYPE minmax GRANULARITY 4,
        INDEX idx_reserved_size reserved_size TYPE minmax GRANULARITY 4,
        INDEX idx_available_size available_size TYPE minmax GRANULARITY 4
    ) ENGINE = ReplacingMergeTree
    ORDER BY (ts, name)",
    "CREATE TABLE IF NOT EXISTS hosts (
        name String,
        ts Int64,
        log_type LowCardinality(String),
        total_size Int64,
        available_size Int64,
        reserved_size Int64,
        INDEX idx_ts ts TYPE minmax GRANULARITY 4,
        INDEX idx_total_size total_size TYPE minmax GRANULARITY 4,
        INDEX idx_reserved_size reserved_size TYPE minmax GRANULARITY 4,
        INDEX idx_available_size available_size TYPE minmax GRANULARITY 4
    ) ENGINE = ReplacingMergeTree
    ORDER BY name",
    "CREATE TABLE IF NOT EXISTS statistics (
        ts Int64,
        total_size Int64,
        reserved_size Int64,
        available_size Int64,
        INDEX idx_total_size total_size TYPE minmax GRANULARITY 4,
        INDEX idx_reserved_size reserved_size TYPE minmax GRANULARITY 4,
        INDEX idx_available_size available_size TYPE minmax GRANULARITY 4
    ) ENGINE = ReplacingMergeTree
    ORDER BY ts",
];

/// Database configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// `ClickHouse` HTTP URL (e.g., <http://localhost:8123>)
    pub url: String,
    /// Output database name
    pub database: String,
    /// Username for authentication
    pub user: String,
    /// Password for authentication
    pub password: String,
}

impl DatabaseConfig {
    /// Load database configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `KADSTATS_DB_URL`: Database URL (default: <http://localhost:8123>)
    /// - `KADSTATS_DB_NAME`: Database name (default: "bdstats")
    /// - `KADSTATS_DB_USER`: Database user (default: "default")
    /// - `KADSTATS_DB_PASSWORD`: Database password (default: empty)
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            url: std::env::var("KADSTATS_DB_URL")
                .unwrap_or_else(|_| "http://localhost:8123".to_string()),
            database: std::env::var("KADSTATS_DB_NAME")
                .unwrap_or_else(|_| DEFAULT_DATABASE.to_string()),
            user: std::env::var("KADSTATS_DB_USER").unwrap_or_else(|_| "default".to_string()),
            password: std::env::var("KADSTATS_DB_PASSWORD").unwrap_or_default(),
        }
    }

    /// Overrides the output database name.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }
}

/// Database client wrapper.
#[derive(Clone)]
pub struct Database {
    client: Arc<Client>,
    server: Client,
    database: String,
}

impl Database {
    /// Create a new database client from configuration.
    ///
    /// No connection is made until the first query.
    #[must_use]
    pub fn new(config: &DatabaseConfig) -> Self {
        let server = Client::default()
            .with_url(&config.url)
            .with_user(&config.user)
            .with_password(&config.password);
        let client = server.clone().with_database(&config.database);

        Self {
            client: Arc::new(client),
            server,
            database: config.database.clone(),
        }
    }

    /// Get a handle to the client bound to the output database.
    #[must_use]
    pub fn client(&self) -> Arc<Client> {
        Arc::clone(&self.client)
    }

    /// Name of the output database.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.database
    }

    /// Test server connectivity by executing a simple query.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cannot be reached or the query fails.
    pub async fn ping(&self) -> Result<()> {
        self.server
            .query("SELECT 1")
            .fetch_one::<u8>()
            .await
            .context("Failed to ping database")?;
        Ok(())
    }

    /// Creates the output database and its tables if they are missing.
    ///
    /// # Errors
    ///
    /// Returns an error if any DDL statement fails.
    pub async fn ensure_schema(&self) -> Result<()> {
        let create_db = format!(
            "CREATE DATABASE IF NOT EXISTS `{}`",
            self.database.replace('`', "")
        );
        self.server
            .query(&create_db)
            .execute()
            .await
            .with_context(|| format!("Failed to create database {}", self.database))?;

        for ddl in SCHEMA {
            self.client
                .query(ddl)
                .execute()
                .await
                .context("Failed to create table")?;
        }

        tracing::debug!(database = %self.database, "Schema ready");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_config_with_database_override() {
        let config = DatabaseConfig {
            url: "http://custom:8123".to_string(),
            database: "bdstats".to_string(),
            user: "kad".to_string(),
            password: "secret".to_string(),
        }
        .with_database("bdstats_test");

        assert_eq!(config.database, "bdstats_test");
        assert_eq!(config.url, "http://custom:8123");
    }

    #[test]
    fn test_database_creation() {
        let config = DatabaseConfig {
            url: "http://localhost:8123".to_string(),
            database: "bdstats".to_string(),
            user: "default".to_string(),
            password: String::new(),
        };

        let db = Database::new(&config);
        assert_eq!(db.name(), "bdstats");
    }

    #[test]
    fn test_schema_declares_all_collections() {
        let joined = SCHEMA.join("\n");
        for table in ["logs", "hosts", "statistics"] {
            assert!(joined.contains(&format!("CREATE TABLE IF NOT EXISTS {table} (")));
        }
        assert!(joined.contains("ORDER BY (ts, name)"));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "requires running ClickHouse instance"]
    async fn test_database_ping_and_schema() {
        let config = DatabaseConfig::from_env().with_database("bdstats_test");
        let db = Database::new(&config);

        db.ping().await.expect("Database ping failed");
        db.ensure_schema().await.expect("Schema setup failed");
    }
}
