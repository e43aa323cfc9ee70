//! Create assignment table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Assignment::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Assignment::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Assignment::StudentId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Assignment::SupervisorId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Assignment::SupervisorType)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Assignment::AssignedBy).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Assignment::AssignedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Assignment::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Assignment::DeactivatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assignment_student")
                            .from(Assignment::Table, Assignment::StudentId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_assignment_supervisor")
                            .from(Assignment::Table, Assignment::SupervisorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (student_id, supervisor_type, is_active) (active supervisor lookup)
        manager
            .create_index(
                Index::create()
                    .name("idx_assignment_student_type_active")
                    .table(Assignment::Table)
                    .col(Assignment::StudentId)
                    .col(Assignment::SupervisorType)
                    .col(Assignment::IsActive)
                    .to_owned(),
            )
            .await?;

        // Index: (supervisor_id, is_active) (listing a supervisor's students)
        manager
            .create_index(
                Index::create()
                    .name("idx_assignment_supervisor_active")
                    .table(Assignment::Table)
                    .col(Assignment::SupervisorId)
                    .col(Assignment::IsActive)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Assignment::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Assignment {
    Table,
    Id,
    StudentId,
    SupervisorId,
    SupervisorType,
    AssignedBy,
    AssignedAt,
    IsActive,
    DeactivatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
