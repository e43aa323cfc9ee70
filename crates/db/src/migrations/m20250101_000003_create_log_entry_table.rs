//! Create log entry table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LogEntry::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LogEntry::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LogEntry::StudentId).string_len(32).not_null())
                    .col(ColumnDef::new(LogEntry::StudentName).string_len(256).not_null())
                    .col(ColumnDef::new(LogEntry::ActivityDate).date().not_null())
                    .col(ColumnDef::new(LogEntry::Description).text().not_null())
                    .col(ColumnDef::new(LogEntry::Latitude).double())
                    .col(ColumnDef::new(LogEntry::Longitude).double())
                    .col(ColumnDef::new(LogEntry::Address).text())
                    .col(
                        ColumnDef::new(LogEntry::Status)
                            .string_len(16)
                            .not_null()
                            .default("draft"),
                    )
                    .col(ColumnDef::new(LogEntry::SupervisorFeedback).text())
                    .col(ColumnDef::new(LogEntry::ApprovedBy).string_len(32))
                    .col(ColumnDef::new(LogEntry::ApprovedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(LogEntry::IndustrialConfirmed).boolean())
                    .col(ColumnDef::new(LogEntry::IndustrialConfirmedBy).string_len(32))
                    .col(ColumnDef::new(LogEntry::IndustrialConfirmedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(LogEntry::IndustrialFeedback).text())
                    .col(ColumnDef::new(LogEntry::IndustrialRating).integer())
                    .col(ColumnDef::new(LogEntry::AcademicReviewedBy).string_len(32))
                    .col(ColumnDef::new(LogEntry::AcademicReviewedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(LogEntry::Version)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(LogEntry::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(LogEntry::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_log_entry_student")
                            .from(LogEntry::Table, LogEntry::StudentId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (student_id, activity_date) (a student's logbook, newest first)
        manager
            .create_index(
                Index::create()
                    .name("idx_log_entry_student_date")
                    .table(LogEntry::Table)
                    .col(LogEntry::StudentId)
                    .col(LogEntry::ActivityDate)
                    .to_owned(),
            )
            .await?;

        // Index: status (review queues)
        manager
            .create_index(
                Index::create()
                    .name("idx_log_entry_status")
                    .table(LogEntry::Table)
                    .col(LogEntry::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LogEntry::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum LogEntry {
    Table,
    Id,
    StudentId,
    StudentName,
    ActivityDate,
    Description,
    Latitude,
    Longitude,
    Address,
    Status,
    SupervisorFeedback,
    ApprovedBy,
    ApprovedAt,
    IndustrialConfirmed,
    IndustrialConfirmedBy,
    IndustrialConfirmedAt,
    IndustrialFeedback,
    IndustrialRating,
    AcademicReviewedBy,
    AcademicReviewedAt,
    Version,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
