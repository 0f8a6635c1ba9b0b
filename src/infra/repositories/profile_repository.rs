//! Profile repository: credentials and the authoritative role.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr};
use uuid::Uuid;

use super::entities::profile::{self, ActiveModel, Entity as ProfileEntity};
use crate::domain::{NewProfile, Profile};
use crate::errors::{AppError, AppResult};

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// Profile repository trait for dependency injection.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Profile>>;

    /// Lookup by normalized (lower-case) email
    async fn find_by_email(&self, email: &str) -> AppResult<Option<Profile>>;

    /// Insert a profile. A duplicate email is reported as a conflict.
    async fn create(&self, profile: NewProfile) -> AppResult<Profile>;
}

/// Profile store. Identity resolution is a trusted path, so it runs on the
/// elevated connection.
pub struct ProfileStore {
    db: DatabaseConnection,
}

impl ProfileStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProfileRepository for ProfileStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Profile>> {
        let result = ProfileEntity::find_by_id(id).one(&self.db).await?;
        Ok(result.map(Profile::from))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Profile>> {
        let result = ProfileEntity::find()
            .filter(profile::Column::Email.eq(email))
            .one(&self.db)
            .await?;
        Ok(result.map(Profile::from))
    }

    async fn create(&self, new: NewProfile) -> AppResult<Profile> {
        let now = Utc::now();
        let active_model = ActiveModel {
            id: Set(new.id),
            email: Set(new.email),
            password_hash: Set(new.password_hash),
            full_name: Set(new.full_name),
            role: Set(new.role.as_str().to_string()),
            id_document_path: Set(new.id_document_path),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let model = active_model.insert(&self.db).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                AppError::conflict("User already exists")
            } else {
                AppError::from(e)
            }
        })?;
        Ok(Profile::from(model))
    }
}
