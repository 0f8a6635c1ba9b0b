//! Application settings loaded from environment variables.

use std::env;

use super::constants::{
    DEFAULT_DATABASE_URL, DEFAULT_DOCUMENT_STORAGE_DIR, DEFAULT_JWT_EXPIRATION_HOURS,
    DEFAULT_PAYMENT_CURRENCY, DEFAULT_REDIS_URL, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
    DEFAULT_STRIPE_API_BASE, DEV_ALLOWED_ORIGINS, ENV_PRODUCTION, MIN_JWT_SECRET_LENGTH,
};

const DEV_JWT_SECRET: &str = "dev-secret-key-minimum-32-chars!!";

/// Deployment mode. Controls error verbosity and the CORS allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn from_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case(ENV_PRODUCTION) {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    /// Restricted connection tier
    pub database_url: String,
    /// Elevated (service-level) connection tier
    pub elevated_database_url: Option<String>,
    pub redis_url: String,
    jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub server_host: String,
    pub server_port: u16,
    pub environment: Environment,
    pub allowed_origins: Vec<String>,
    /// Key rate limits on X-Forwarded-For / X-Real-IP. Only safe behind a
    /// proxy that overwrites them.
    pub trust_proxy_headers: bool,
    stripe_secret_key: Option<String>,
    stripe_webhook_secret: String,
    pub stripe_api_base: String,
    pub payment_currency: String,
    pub document_storage_dir: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("elevated_database_url", &"[REDACTED]")
            .field("redis_url", &"[REDACTED]")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiration_hours", &self.jwt_expiration_hours)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("environment", &self.environment)
            .field("allowed_origins", &self.allowed_origins)
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .field("stripe_secret_key", &"[REDACTED]")
            .field("stripe_webhook_secret", &"[REDACTED]")
            .field("stripe_api_base", &self.stripe_api_base)
            .field("payment_currency", &self.payment_currency)
            .field("document_storage_dir", &self.document_storage_dir)
            .finish()
    }
}

impl Default for Config {
    /// Local development settings. Never used as-is in release builds.
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            elevated_database_url: None,
            redis_url: DEFAULT_REDIS_URL.to_string(),
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_expiration_hours: DEFAULT_JWT_EXPIRATION_HOURS,
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            environment: Environment::Development,
            allowed_origins: DEV_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
            trust_proxy_headers: false,
            stripe_secret_key: None,
            stripe_webhook_secret: String::new(),
            stripe_api_base: DEFAULT_STRIPE_API_BASE.to_string(),
            payment_currency: DEFAULT_PAYMENT_CURRENCY.to_string(),
            document_storage_dir: DEFAULT_DOCUMENT_STORAGE_DIR.to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Panics
    /// Panics if JWT_SECRET is missing in a release build or shorter than
    /// the minimum length.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            if cfg!(debug_assertions) {
                tracing::warn!("JWT_SECRET not set, using insecure default for development");
                DEV_JWT_SECRET.to_string()
            } else {
                panic!("JWT_SECRET environment variable must be set in production");
            }
        });

        if jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            panic!(
                "JWT_SECRET must be at least {} characters long",
                MIN_JWT_SECRET_LENGTH
            );
        }

        let environment = Environment::from_value(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let stripe_secret_key = non_empty(env::var("STRIPE_SECRET_KEY").ok());
        if stripe_secret_key.is_none() {
            tracing::warn!("STRIPE_SECRET_KEY not set, payment intents will be rejected upstream");
        }

        let elevated_database_url = non_empty(env::var("DATABASE_ELEVATED_URL").ok());
        if elevated_database_url.is_none() {
            tracing::warn!(
                "DATABASE_ELEVATED_URL not set, trusted paths will share the restricted connection"
            );
        }

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            elevated_database_url,
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string()),
            jwt_secret,
            jwt_expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_JWT_EXPIRATION_HOURS),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SERVER_PORT),
            environment,
            allowed_origins: allowed_origins(
                env::var("CLIENT_URL").ok().as_deref(),
                env::var("CORS_ALLOWED_ORIGINS").ok().as_deref(),
                environment,
            ),
            trust_proxy_headers: env::var("TRUST_PROXY_HEADERS")
                .ok()
                .is_some_and(|v| parse_flag(&v)),
            stripe_secret_key,
            stripe_webhook_secret: env::var("STRIPE_WEBHOOK_SECRET").unwrap_or_default(),
            stripe_api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| DEFAULT_STRIPE_API_BASE.to_string()),
            payment_currency: env::var("PAYMENT_CURRENCY")
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|_| DEFAULT_PAYMENT_CURRENCY.to_string()),
            document_storage_dir: env::var("DOCUMENT_STORAGE_DIR")
                .unwrap_or_else(|_| DEFAULT_DOCUMENT_STORAGE_DIR.to_string()),
        }
    }

    /// Get JWT secret bytes for token signing/verification.
    pub fn jwt_secret_bytes(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }

    /// Payment processor API key, if configured.
    pub fn stripe_secret_key(&self) -> Option<&str> {
        self.stripe_secret_key.as_deref()
    }

    /// Shared secret used to sign inbound webhook events.
    pub fn webhook_secret(&self) -> &str {
        &self.stripe_webhook_secret
    }

    /// Replace the webhook signing secret.
    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.stripe_webhook_secret = secret.into();
        self
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Build the CORS allow-list from comma-separated sources.
fn allowed_origins(
    client_url: Option<&str>,
    extra: Option<&str>,
    environment: Environment,
) -> Vec<String> {
    let mut origins: Vec<String> = client_url
        .into_iter()
        .chain(extra)
        .flat_map(|list| list.split(','))
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect();

    if !environment.is_production() {
        origins.extend(DEV_ALLOWED_ORIGINS.iter().map(|o| o.to_string()));
    }

    origins.sort();
    origins.dedup();
    origins
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_excludes_localhost_origins() {
        let origins = allowed_origins(
            Some("https://helpora.app/"),
            Some("https://admin.helpora.app, "),
            Environment::Production,
        );
        assert_eq!(
            origins,
            vec![
                "https://admin.helpora.app".to_string(),
                "https://helpora.app".to_string()
            ]
        );
    }

    #[test]
    fn development_adds_localhost_origins() {
        let origins = allowed_origins(None, None, Environment::Development);
        assert!(origins.contains(&"http://localhost:3000".to_string()));
        assert!(origins.contains(&"http://127.0.0.1:8000".to_string()));
    }

    #[test]
    fn environment_parsing_defaults_to_development() {
        assert_eq!(Environment::from_value("PRODUCTION"), Environment::Production);
        assert_eq!(Environment::from_value("staging"), Environment::Development);
    }

    #[test]
    fn proxy_headers_are_untrusted_unless_enabled() {
        assert!(!Config::default().trust_proxy_headers);
        assert!(parse_flag("true"));
        assert!(parse_flag(" YES "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = Config::default().with_webhook_secret("whsec_super_secret");
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("whsec_super_secret"));
        assert!(!rendered.contains(DEV_JWT_SECRET));
    }
}
