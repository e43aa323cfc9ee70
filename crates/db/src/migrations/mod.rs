//! Database migrations.
//!
//! Schema migrations for the database. Every migration runs on both
//! `PostgreSQL` and `SQLite`.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_user_table;
mod m20250101_000002_create_assignment_table;
mod m20250101_000003_create_log_entry_table;
mod m20250101_000004_create_check_in_table;
mod m20250101_000005_create_notification_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_user_table::Migration),
            Box::new(m20250101_000002_create_assignment_table::Migration),
            Box::new(m20250101_000003_create_log_entry_table::Migration),
            Box::new(m20250101_000004_create_check_in_table::Migration),
            Box::new(m20250101_000005_create_notification_table::Migration),
        ]
    }
}
