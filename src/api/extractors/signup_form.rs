//! Signup body: JSON, or multipart when an identity document is attached.

use axum::{
    async_trait,
    extract::{multipart::Field, FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::Deserialize;

use crate::errors::{AppError, AppResult};
use crate::infra::UploadedDocument;
use crate::services::SignupInput;

/// JSON signup body
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SignupRequest {
    #[serde(default)]
    #[schema(example = "jane@example.com")]
    pub email: String,
    #[serde(default)]
    #[schema(example = "secret123", min_length = 6)]
    pub password: String,
    /// `customer` (default) or `provider`
    #[serde(default)]
    #[schema(example = "provider")]
    pub role: Option<String>,
    #[serde(default, alias = "fullName")]
    #[schema(example = "Jane Doe")]
    pub full_name: Option<String>,
}

impl From<SignupRequest> for SignupInput {
    fn from(request: SignupRequest) -> Self {
        Self {
            email: request.email,
            password: request.password,
            role: request.role,
            full_name: request.full_name,
            id_document: None,
        }
    }
}

pub struct SignupForm(pub SignupInput);

#[async_trait]
impl<S> FromRequest<S> for SignupForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("multipart/form-data"));

        if multipart {
            let form = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return read_multipart(form).await.map(SignupForm);
        }

        let Json(request) = Json::<SignupRequest>::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(e.body_text()))?;
        Ok(SignupForm(request.into()))
    }
}

async fn read_multipart(mut form: Multipart) -> AppResult<SignupInput> {
    let mut input = SignupInput::default();

    while let Some(field) = form.next_field().await.map_err(malformed)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "idDocument" | "id_document" => input.id_document = read_document(field).await?,
            "email" => input.email = field.text().await.map_err(malformed)?,
            "password" => input.password = field.text().await.map_err(malformed)?,
            "role" => input.role = Some(field.text().await.map_err(malformed)?),
            "fullName" | "full_name" => input.full_name = Some(field.text().await.map_err(malformed)?),
            _ => {}
        }
    }

    Ok(input)
}

/// Browsers submit an empty part when no file was picked.
async fn read_document(field: Field<'_>) -> AppResult<Option<UploadedDocument>> {
    let file_name = field.file_name().unwrap_or("document").to_string();
    let content_type = field.content_type().map(str::to_string);
    let bytes = field.bytes().await.map_err(malformed)?;

    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(UploadedDocument {
        file_name,
        content_type,
        bytes: bytes.to_vec(),
    }))
}

fn malformed(e: axum::extract::multipart::MultipartError) -> AppError {
    AppError::BadRequest(e.body_text())
}
