//! Roles and the authenticated caller identity.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::{ROLE_ADMIN, ROLE_CUSTOMER, ROLE_PROVIDER, SIGNUP_ROLES};
use crate::errors::{AppError, AppResult};

/// Marketplace roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Provider,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => ROLE_CUSTOMER,
            Role::Provider => ROLE_PROVIDER,
            Role::Admin => ROLE_ADMIN,
        }
    }

    pub fn is_customer(&self) -> bool {
        matches!(self, Role::Customer)
    }

    /// Providers are the professionals who carry out bookings.
    pub fn is_professional(&self) -> bool {
        matches!(self, Role::Provider)
    }

    /// Resolve the role requested at signup. Defaults to customer.
    pub fn for_signup(requested: Option<&str>) -> AppResult<Self> {
        let requested = match requested.map(str::trim) {
            None | Some("") => return Ok(Role::Customer),
            Some(value) => value.to_lowercase(),
        };

        match requested.as_str() {
            ROLE_CUSTOMER => Ok(Role::Customer),
            ROLE_PROVIDER => Ok(Role::Provider),
            ROLE_ADMIN => Err(AppError::validation("Admin registration is not allowed")),
            _ => Err(AppError::validation(format!(
                "Invalid role. Allowed roles: {}",
                SIGNUP_ROLES.join(", ")
            ))),
        }
    }
}

/// Stored roles are trusted; anything unrecognized degrades to the least
/// privileged role.
impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s {
            ROLE_ADMIN => Role::Admin,
            ROLE_PROVIDER => Role::Provider,
            _ => Role::Customer,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller resolved from a bearer credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl Identity {
    pub fn new(id: Uuid, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            email: email.into(),
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_defaults_to_customer() {
        assert_eq!(Role::for_signup(None).unwrap(), Role::Customer);
        assert_eq!(Role::for_signup(Some("  ")).unwrap(), Role::Customer);
    }

    #[test]
    fn signup_accepts_provider_case_insensitively() {
        assert_eq!(Role::for_signup(Some("Provider")).unwrap(), Role::Provider);
    }

    #[test]
    fn signup_rejects_admin_with_dedicated_message() {
        let err = Role::for_signup(Some("admin")).unwrap_err();
        assert_eq!(err.to_string(), "Admin registration is not allowed");
    }

    #[test]
    fn signup_rejects_unknown_roles() {
        let err = Role::for_signup(Some("plumber")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(err.to_string().contains("customer, provider"));
    }

    #[test]
    fn unknown_stored_role_is_least_privileged() {
        assert_eq!(Role::from("superuser"), Role::Customer);
        assert!(Role::from("provider").is_professional());
    }
}
