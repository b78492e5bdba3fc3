//! Database connection pool management
//!
//! Provides a wrapper around SQLx's SqlitePool with:
//! - Automatic directory creation for database files
//! - WAL journal mode for concurrent reads alongside the single writer
//! - Numbered schema migrations tracked in `db_metadata(key='schema_version')`
//! - In-memory mode for testing

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::CatalogError;

/// Numbered migrations, applied in order on first connection.
const MIGRATIONS: &[(i64, &str, &str)] = &[
    (1, "001_initial", include_str!("migrations/001_initial.sql")),
    (2, "002_search", include_str!("migrations/002_search.sql")),
];

/// Manages a pool of SQLite connections for the catalog
///
/// The pool is configured with:
/// - WAL journal mode for concurrent read access
/// - Foreign keys enforced
/// - 5 max connections for file-based databases
/// - 1 connection for in-memory databases (required for data persistence)
/// - 5-second busy timeout to handle write contention
pub struct CatalogPool {
    pool: SqlitePool,
}

impl CatalogPool {
    /// Creates a new pool connected to the specified file
    ///
    /// This will:
    /// 1. Create parent directories if they don't exist
    /// 2. Create the database file if it doesn't exist
    /// 3. Enable WAL journal mode and foreign keys
    /// 4. Apply pending schema migrations
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ConnectionFailed` if the connection cannot be
    /// established, or `CatalogError::MigrationFailed` if migrations fail.
    pub async fn new(db_path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CatalogError::ConnectionFailed(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                CatalogError::ConnectionFailed(format!(
                    "Failed to connect to database at {}: {}",
                    db_path.display(),
                    e
                ))
            })?;

        Self::run_migrations(&pool).await?;

        tracing::info!(
            path = %db_path.display(),
            "Catalog pool initialized"
        );

        Ok(Self { pool })
    }

    /// Creates an in-memory pool for testing
    ///
    /// Uses a single connection to ensure data persistence across queries
    /// (SQLite in-memory databases are per-connection).
    pub async fn in_memory() -> Result<Self, CatalogError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| {
                CatalogError::ConnectionFailed(format!(
                    "Failed to create in-memory database: {}",
                    e
                ))
            })?;

        sqlx::raw_sql("PRAGMA foreign_keys = ON;")
            .execute(&pool)
            .await
            .map_err(|e| {
                CatalogError::MigrationFailed(format!("Failed to enable foreign keys: {}", e))
            })?;

        Self::run_migrations(&pool).await?;

        tracing::debug!("In-memory catalog pool initialized");

        Ok(Self { pool })
    }

    /// Returns a reference to the underlying SQLite connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies migrations newer than the stored schema version, in order.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), CatalogError> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS db_metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL);",
        )
        .execute(pool)
        .await
        .map_err(|e| CatalogError::MigrationFailed(format!("Failed to create db_metadata: {e}")))?;

        let current: i64 = sqlx::query_scalar::<_, String>(
            "SELECT value FROM db_metadata WHERE key = 'schema_version'",
        )
        .fetch_optional(pool)
        .await
        .map_err(|e| CatalogError::MigrationFailed(format!("Failed to read schema_version: {e}")))?
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

        for (version, name, sql) in MIGRATIONS {
            if *version <= current {
                continue;
            }
            sqlx::raw_sql(sql).execute(pool).await.map_err(|e| {
                CatalogError::MigrationFailed(format!("Migration {name} failed: {e}"))
            })?;
            sqlx::query(
                "INSERT INTO db_metadata (key, value) VALUES ('schema_version', ?1)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            )
            .bind(version.to_string())
            .execute(pool)
            .await
            .map_err(|e| {
                CatalogError::MigrationFailed(format!("Failed to record migration {name}: {e}"))
            })?;
            tracing::debug!(migration = name, "Applied catalog migration");
        }

        Ok(())
    }
}
