//! Test utilities for database operations.
//!
//! Provides a migrated in-memory `SQLite` database so that repository and
//! service tests run real queries without an external server.

use std::sync::Arc;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::migrations::Migrator;

/// URL of a private in-memory `SQLite` database.
pub const IN_MEMORY_URL: &str = "sqlite::memory:";

/// A test database context with the full schema applied.
pub struct TestDatabase {
    /// Database connection.
    pub conn: Arc<DatabaseConnection>,
}

impl TestDatabase {
    /// Create a fresh in-memory database and run all migrations.
    ///
    /// Each `sqlite::memory:` connection owns its own database, so the pool
    /// is pinned to exactly one connection.
    pub async fn new() -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new(IN_MEMORY_URL);
        opt.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;
        Migrator::up(&conn, None).await?;

        info!("Created in-memory test database");

        Ok(Self {
            conn: Arc::new(conn),
        })
    }

    /// Get a shared handle to the connection.
    #[must_use]
    pub fn connection(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.conn)
    }

    /// Delete all rows, children before parents.
    pub async fn cleanup(&self) -> Result<(), DbErr> {
        for table in ["notification", "check_in", "log_entry", "assignment", "user"] {
            self.conn
                .execute_unprepared(&format!("DELETE FROM \"{table}\""))
                .await?;
        }
        info!("Cleaned up test database");
        Ok(())
    }
}
