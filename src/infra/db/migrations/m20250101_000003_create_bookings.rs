//! Migration: bookings with lifecycle and payment state.

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_profiles::Profiles;
use super::m20250101_000002_create_services::Services;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Bookings::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Bookings::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Bookings::CustomerId).uuid().not_null())
                    .col(ColumnDef::new(Bookings::ProfessionalId).uuid().null())
                    .col(ColumnDef::new(Bookings::ServiceId).uuid().null())
                    .col(ColumnDef::new(Bookings::ServiceType).string_len(100).not_null())
                    .col(
                        ColumnDef::new(Bookings::ScheduledAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Bookings::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Bookings::PaymentStatus)
                            .string_len(16)
                            .not_null()
                            .default("unpaid"),
                    )
                    .col(ColumnDef::new(Bookings::PaymentIntentId).string().null())
                    .col(ColumnDef::new(Bookings::Price).decimal_len(10, 2).not_null())
                    .col(
                        ColumnDef::new(Bookings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Bookings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_customer")
                            .from(Bookings::Table, Bookings::CustomerId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_professional")
                            .from(Bookings::Table, Bookings::ProfessionalId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_bookings_service")
                            .from(Bookings::Table, Bookings::ServiceId)
                            .to(Services::Table, Services::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_customer_id")
                    .table(Bookings::Table)
                    .col(Bookings::CustomerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_professional_id")
                    .table(Bookings::Table)
                    .col(Bookings::ProfessionalId)
                    .to_owned(),
            )
            .await?;

        // Open-jobs query: pending rows without a professional
        manager
            .create_index(
                Index::create()
                    .name("idx_bookings_status_professional")
                    .table(Bookings::Table)
                    .col(Bookings::Status)
                    .col(Bookings::ProfessionalId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Bookings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Bookings {
    Table,
    Id,
    CustomerId,
    ProfessionalId,
    ServiceId,
    ServiceType,
    ScheduledAt,
    Status,
    PaymentStatus,
    PaymentIntentId,
    Price,
    CreatedAt,
    UpdatedAt,
}
