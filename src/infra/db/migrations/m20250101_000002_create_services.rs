//! Migration: provider service listings.

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_profiles::Profiles;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Services::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Services::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Services::ProviderId).uuid().not_null())
                    .col(ColumnDef::new(Services::Title).string_len(100).not_null())
                    .col(ColumnDef::new(Services::Description).text().null())
                    .col(ColumnDef::new(Services::Price).decimal_len(10, 2).not_null())
                    .col(ColumnDef::new(Services::Category).string_len(64).not_null())
                    .col(
                        ColumnDef::new(Services::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Services::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_services_provider")
                            .from(Services::Table, Services::ProviderId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .check(Expr::col(Services::Price).gt(0))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_services_provider_id")
                    .table(Services::Table)
                    .col(Services::ProviderId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Services::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Services {
    Table,
    Id,
    ProviderId,
    Title,
    Description,
    Price,
    Category,
    CreatedAt,
    UpdatedAt,
}
