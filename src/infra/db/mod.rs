//! Database connections and migrations.
//!
//! Two credential tiers are held side by side: a restricted connection for
//! public reads and an elevated one for trusted writes that bypass row-level
//! policies. Both are handed explicitly to the stores that need them.

use sea_orm::{ConnectionTrait, Database as SeaDatabase, DatabaseConnection, DbErr, Statement};
use sea_orm_migration::MigratorTrait;

use crate::config::Config;

pub mod migrations;

pub use migrations::Migrator;

/// Database wrapper holding both credential tiers
#[derive(Clone)]
pub struct Database {
    restricted: DatabaseConnection,
    elevated: DatabaseConnection,
}

impl Database {
    /// Connect both tiers and apply pending migrations.
    pub async fn connect(config: &Config) -> Result<Self, DbErr> {
        let db = Self::connect_without_migrations(config).await?;
        db.run_migrations().await?;
        tracing::info!("Database connected and migrations applied");
        Ok(db)
    }

    /// Connect without running migrations (for CLI commands).
    pub async fn connect_without_migrations(config: &Config) -> Result<Self, DbErr> {
        let restricted = SeaDatabase::connect(&config.database_url).await?;
        let elevated = match config.elevated_database_url.as_deref() {
            Some(url) => SeaDatabase::connect(url).await?,
            None => restricted.clone(),
        };
        Ok(Self::from_connections(restricted, elevated))
    }

    /// Wrap already-open connections.
    pub fn from_connections(restricted: DatabaseConnection, elevated: DatabaseConnection) -> Self {
        Self {
            restricted,
            elevated,
        }
    }

    /// Connection subject to row-level policies.
    pub fn restricted(&self) -> DatabaseConnection {
        self.restricted.clone()
    }

    /// Service-level connection. Only trusted code paths receive it.
    pub fn elevated(&self) -> DatabaseConnection {
        self.elevated.clone()
    }

    /// Schema changes run with elevated rights.
    pub async fn run_migrations(&self) -> Result<(), DbErr> {
        Migrator::up(&self.elevated, None).await
    }

    /// Rollback the last migration.
    pub async fn rollback_migration(&self) -> Result<(), DbErr> {
        Migrator::down(&self.elevated, Some(1)).await
    }

    /// Get migration status (list all migrations with applied status).
    pub async fn migration_status(&self) -> Result<Vec<(String, bool)>, DbErr> {
        use sea_orm::{EntityTrait, QueryOrder};
        use sea_orm_migration::seaql_migrations;

        let applied: std::collections::HashSet<String> = seaql_migrations::Entity::find()
            .order_by_asc(seaql_migrations::Column::Version)
            .all(&self.elevated)
            .await?
            .into_iter()
            .map(|m| m.version)
            .collect();

        Ok(Migrator::migrations()
            .iter()
            .map(|m| {
                let name = m.name().to_string();
                let is_applied = applied.contains(&name);
                (name, is_applied)
            })
            .collect())
    }

    /// Reset database and run all migrations fresh.
    pub async fn fresh_migrations(&self) -> Result<(), DbErr> {
        Migrator::fresh(&self.elevated).await
    }

    /// Check connectivity of both tiers.
    pub async fn ping(&self) -> Result<(), DbErr> {
        for connection in [&self.restricted, &self.elevated] {
            connection
                .execute(Statement::from_string(
                    connection.get_database_backend(),
                    "SELECT 1".to_string(),
                ))
                .await?;
        }
        Ok(())
    }
}
