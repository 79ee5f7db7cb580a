//! Database connection manager backed by a pooled SQLite database.

use std::path::{Path, PathBuf};

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tempora_domain::{Result, TemporaError};
use tracing::info;

use crate::errors::InfraError;

const SCHEMA_VERSION: i32 = 1;
const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Pooled connection handle used by the stores.
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Database manager that wraps an r2d2 SQLite pool.
///
/// Every connection gets WAL mode, enforced foreign keys and a busy timeout
/// applied before first use.
pub struct DbManager {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl DbManager {
    /// Create a new manager with the given pool size.
    pub fn new<P: AsRef<Path>>(db_path: P, pool_size: u32) -> Result<Self> {
        let path = db_path.as_ref().to_path_buf();

        let manager = SqliteConnectionManager::file(&path).with_init(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA wal_autocheckpoint=1000;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA foreign_keys=ON;
                 PRAGMA busy_timeout=5000;",
            )
        });

        let pool = Pool::builder().max_size(pool_size.max(1)).build(manager).map_err(|e| {
            TemporaError::Database(format!("failed to create connection pool: {e}"))
        })?;

        info!(
            db_path = %path.display(),
            max_connections = pool.max_size(),
            "sqlite pool initialised"
        );

        Ok(Self { pool, path })
    }

    /// Acquire a connection from the pool.
    pub fn get_connection(&self) -> Result<DbConnection> {
        self.pool.get().map_err(map_pool_error)
    }

    /// Ensure the full schema exists on the current database.
    pub fn run_migrations(&self) -> Result<()> {
        let conn = self.get_connection()?;
        conn.execute_batch(SCHEMA_SQL).map_err(map_sql_error)?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (?1, CAST(strftime('%s','now') AS INTEGER))",
            params![SCHEMA_VERSION],
        )
        .map_err(map_sql_error)?;
        Ok(())
    }

    /// Return the configured database path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Perform a health check to verify database connectivity.
    ///
    /// This method acquires a connection from the pool and executes a simple
    /// query to verify the database is accessible and responding.
    pub fn health_check(&self) -> Result<()> {
        let conn = self.get_connection()?;
        // Simple query to verify database is responsive
        conn.query_row("SELECT 1", params![], |row| row.get::<_, i32>(0))
            .map_err(map_sql_error)?;
        Ok(())
    }
}

pub(crate) fn map_sql_error(err: rusqlite::Error) -> TemporaError {
    TemporaError::from(InfraError::from(err))
}

fn map_pool_error(err: r2d2::Error) -> TemporaError {
    TemporaError::from(InfraError::from(err))
}
