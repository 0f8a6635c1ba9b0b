//! Profile database entity for SeaORM.

use sea_orm::entity::prelude::*;

use crate::domain::{Profile, Role};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: String,
    pub id_document_path: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Profile {
    fn from(model: Model) -> Self {
        Profile {
            id: model.id,
            email: model.email,
            password_hash: model.password_hash,
            full_name: model.full_name,
            role: Role::from(model.role.as_str()),
            id_document_path: model.id_document_path,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}
