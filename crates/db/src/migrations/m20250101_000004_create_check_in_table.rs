//! Create check-in table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CheckIn::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CheckIn::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CheckIn::StudentId).string_len(32).not_null())
                    .col(ColumnDef::new(CheckIn::StudentName).string_len(256).not_null())
                    .col(
                        ColumnDef::new(CheckIn::CheckedInAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CheckIn::LocalDate).date().not_null())
                    .col(ColumnDef::new(CheckIn::Latitude).double().not_null())
                    .col(ColumnDef::new(CheckIn::Longitude).double().not_null())
                    .col(ColumnDef::new(CheckIn::Address).text().not_null())
                    .col(ColumnDef::new(CheckIn::Status).string_len(16).not_null())
                    .col(ColumnDef::new(CheckIn::IsAutomatic).boolean().not_null())
                    .col(ColumnDef::new(CheckIn::DistanceMeters).double())
                    .col(ColumnDef::new(CheckIn::SiteStatus).string_len(16))
                    .col(ColumnDef::new(CheckIn::AutoDay).date())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_check_in_student")
                            .from(CheckIn::Table, CheckIn::StudentId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (student_id, auto_day) - one automatic check-in per day.
        // Manual rows leave auto_day NULL and are not constrained.
        manager
            .create_index(
                Index::create()
                    .name("idx_check_in_student_auto_day")
                    .table(CheckIn::Table)
                    .col(CheckIn::StudentId)
                    .col(CheckIn::AutoDay)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: (student_id, local_date) (daily lookups and history)
        manager
            .create_index(
                Index::create()
                    .name("idx_check_in_student_local_date")
                    .table(CheckIn::Table)
                    .col(CheckIn::StudentId)
                    .col(CheckIn::LocalDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CheckIn::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum CheckIn {
    Table,
    Id,
    StudentId,
    StudentName,
    CheckedInAt,
    LocalDate,
    Latitude,
    Longitude,
    Address,
    Status,
    IsAutomatic,
    DistanceMeters,
    SiteStatus,
    AutoDay,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
