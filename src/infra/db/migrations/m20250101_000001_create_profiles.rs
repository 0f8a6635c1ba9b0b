//! Migration: profiles table (credentials, display name, role).

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Profiles::Id).uuid().not_null().primary_key())
                    .col(
                        ColumnDef::new(Profiles::Email)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Profiles::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Profiles::FullName).string_len(255).null())
                    .col(
                        ColumnDef::new(Profiles::Role)
                            .string_len(16)
                            .not_null()
                            .default("customer"),
                    )
                    .col(ColumnDef::new(Profiles::IdDocumentPath).string().null())
                    .col(
                        ColumnDef::new(Profiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Profiles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Profiles {
    Table,
    Id,
    Email,
    PasswordHash,
    FullName,
    Role,
    IdDocumentPath,
    CreatedAt,
    UpdatedAt,
}
