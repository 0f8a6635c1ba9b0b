//! Profile entity: credentials, display data and the authoritative role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::role::{Identity, Role};

/// Profile domain entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub id_document_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn identity(&self) -> Identity {
        Identity::new(self.id, self.email.clone(), self.role)
    }
}

/// Data needed to persist a new profile. The id is chosen up front so
/// uploads can be filed under it before the row exists.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub id_document_path: Option<String>,
}

/// Profile response (public view)
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ProfileResponse {
    pub id: Uuid,
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[schema(example = "Jane Doe")]
    pub full_name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            id: profile.id,
            email: profile.email,
            full_name: profile.full_name,
            role: profile.role,
            created_at: profile.created_at,
        }
    }
}
