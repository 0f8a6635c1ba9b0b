//! Migrate command - Database migration management.
//!
//! Migrations always run over the elevated connection.

use sea_orm::DbErr;

use crate::cli::args::{MigrateAction, MigrateArgs};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::Database;

fn failed(step: &'static str) -> impl Fn(DbErr) -> AppError {
    move |e| AppError::internal(format!("{step} failed: {e}"))
}

/// Execute the migrate command
pub async fn execute(args: MigrateArgs, config: Config) -> AppResult<()> {
    // Connect without auto-running migrations for manual control
    let db = Database::connect_without_migrations(&config)
        .await
        .map_err(failed("Database connection"))?;

    match args.action {
        MigrateAction::Up => {
            db.run_migrations().await.map_err(failed("Migration"))?;
            tracing::info!("Migrations applied");
        }
        MigrateAction::Down => {
            db.rollback_migration().await.map_err(failed("Rollback"))?;
            tracing::info!("Last migration rolled back");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await.map_err(failed("Status check"))?;
            let pending = status.iter().filter(|(_, applied)| !applied).count();
            for (name, applied) in &status {
                println!("{:<40} {}", name, if *applied { "applied" } else { "pending" });
            }
            tracing::info!(total = status.len(), pending, "Migration status");
        }
        MigrateAction::Fresh => {
            tracing::warn!("Dropping all tables and re-running migrations");
            db.fresh_migrations().await.map_err(failed("Fresh migration"))?;
            tracing::info!("Schema rebuilt");
        }
    }

    Ok(())
}
