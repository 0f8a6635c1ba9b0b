//! Authentication service - signup, login and bearer resolution.
//!
//! Tokens only carry the subject. The role is always re-read from the
//! profile store, so a role change takes effect on the next request.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::ValidateEmail;

use crate::config::{Config, SECONDS_PER_HOUR, TOKEN_TYPE_BEARER};
use crate::domain::{Identity, NewProfile, Password, Profile, ProfileResponse, Role};
use crate::errors::{AppError, AppResult};
use crate::infra::{DocumentStore, ProfileRepository, UploadedDocument};

/// JWT claims payload
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
    pub iat: i64,
}

/// Session issued after signup or login
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TokenResponse {
    /// JWT access token
    #[schema(example = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9...")]
    pub access_token: String,
    /// Token type (always "Bearer")
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Token lifetime in seconds
    #[schema(example = 86400)]
    pub expires_in: i64,
}

/// Signup request after transport decoding (JSON or multipart).
#[derive(Debug, Clone, Default)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    pub role: Option<String>,
    pub full_name: Option<String>,
    pub id_document: Option<UploadedDocument>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignupOutcome {
    #[schema(example = "User created successfully")]
    pub message: String,
    pub user: ProfileResponse,
    pub session: TokenResponse,
    pub role: Role,
    pub id_document_path: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginOutcome {
    #[schema(example = "Login successful")]
    pub message: String,
    pub user: ProfileResponse,
    pub session: TokenResponse,
    pub role: Role,
}

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a customer or provider
    async fn signup(&self, input: SignupInput) -> AppResult<SignupOutcome>;

    /// Check credentials and issue a session
    async fn login(&self, email: String, password: String) -> AppResult<LoginOutcome>;

    /// Verify a bearer token and load the caller's current role
    async fn resolve(&self, token: &str) -> AppResult<Identity>;
}

fn issue_token(profile: &Profile, config: &Config) -> AppResult<TokenResponse> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(config.jwt_expiration_hours);

    let claims = Claims {
        sub: profile.id,
        email: profile.email.clone(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret_bytes()),
    )?;

    Ok(TokenResponse {
        access_token: token,
        token_type: TOKEN_TYPE_BEARER.to_string(),
        expires_in: config.jwt_expiration_hours * SECONDS_PER_HOUR,
    })
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub struct Authenticator {
    profiles: Arc<dyn ProfileRepository>,
    documents: Arc<dyn DocumentStore>,
    config: Config,
}

impl Authenticator {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        documents: Arc<dyn DocumentStore>,
        config: Config,
    ) -> Self {
        Self {
            profiles,
            documents,
            config,
        }
    }

    /// Store a provider's identity document. Failures are logged and the
    /// signup proceeds without it.
    async fn store_document(&self, profile_id: Uuid, document: UploadedDocument) -> Option<String> {
        match self.documents.store(profile_id, document).await {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!(profile_id = %profile_id, error = %e, "Identity document upload failed");
                None
            }
        }
    }
}

#[async_trait]
impl AuthService for Authenticator {
    async fn signup(&self, input: SignupInput) -> AppResult<SignupOutcome> {
        let email = normalize_email(&input.email);
        if !email.validate_email() {
            return Err(AppError::validation("Please provide a valid email address"));
        }
        let role = Role::for_signup(input.role.as_deref())?;
        let password_hash = Password::hash(&input.password)?.into_string();
        let full_name = input
            .full_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        if self.profiles.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("User already exists"));
        }

        let id = Uuid::new_v4();
        let id_document_path = match (role, input.id_document) {
            (Role::Provider, Some(document)) => self.store_document(id, document).await,
            _ => None,
        };

        let profile = self
            .profiles
            .create(NewProfile {
                id,
                email,
                password_hash,
                full_name,
                role,
                id_document_path,
            })
            .await?;

        let session = issue_token(&profile, &self.config)?;
        tracing::info!(profile_id = %profile.id, role = %profile.role, "Profile created");

        Ok(SignupOutcome {
            message: "User created successfully".to_string(),
            role: profile.role,
            id_document_path: profile.id_document_path.clone(),
            user: profile.into(),
            session,
        })
    }

    async fn login(&self, email: String, password: String) -> AppResult<LoginOutcome> {
        let profile = self.profiles.find_by_email(&normalize_email(&email)).await?;

        // Unknown emails still pay for a full verification.
        let verified = match &profile {
            Some(profile) => Password::from_hash(profile.password_hash.as_str()).verify(&password),
            None => Password::verify_against_dummy(&password),
        };

        let profile = match profile {
            Some(profile) if verified => profile,
            _ => {
                tracing::warn!("Failed login attempt");
                return Err(AppError::InvalidCredentials);
            }
        };

        let session = issue_token(&profile, &self.config)?;
        Ok(LoginOutcome {
            message: "Login successful".to_string(),
            role: profile.role,
            user: profile.into(),
            session,
        })
    }

    async fn resolve(&self, token: &str) -> AppResult<Identity> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            tracing::debug!(error = %e, "Bearer token rejected");
            AppError::Unauthorized
        })?
        .claims;

        let profile = self
            .profiles
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)?;

        Ok(profile.identity())
    }
}
