//! Database migrations.
//!
//! Migration names follow the pattern: m{YYYYMMDD}_{NNNNNN}_{description}

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_profiles;
mod m20250101_000002_create_services;
mod m20250101_000003_create_bookings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_profiles::Migration),
            Box::new(m20250101_000002_create_services::Migration),
            Box::new(m20250101_000003_create_bookings::Migration),
        ]
    }
}
