//! Create user table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(User::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(User::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(User::Email)
                            .string_len(256)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(User::Name).string_len(256).not_null())
                    .col(ColumnDef::new(User::Role).string_len(32).not_null())
                    .col(ColumnDef::new(User::Institution).string_len(256))
                    .col(ColumnDef::new(User::Department).string_len(256))
                    .col(ColumnDef::new(User::MatricNumber).string_len(64))
                    .col(ColumnDef::new(User::PlacementAddress).text())
                    .col(ColumnDef::new(User::PlacementLatitude).double())
                    .col(ColumnDef::new(User::PlacementLongitude).double())
                    .col(ColumnDef::new(User::Timezone).string_len(64))
                    .col(ColumnDef::new(User::AssignedSupervisorId).string_len(32))
                    .col(ColumnDef::new(User::AssignedIndustrialSupervisorId).string_len(32))
                    .col(
                        ColumnDef::new(User::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(User::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(User::UpdatedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // Index: role (for admin listings by role)
        manager
            .create_index(
                Index::create()
                    .name("idx_user_role")
                    .table(User::Table)
                    .col(User::Role)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(User::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum User {
    Table,
    Id,
    Email,
    Name,
    Role,
    Institution,
    Department,
    MatricNumber,
    PlacementAddress,
    PlacementLatitude,
    PlacementLongitude,
    Timezone,
    AssignedSupervisorId,
    AssignedIndustrialSupervisorId,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
