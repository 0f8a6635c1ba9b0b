//! Password value object backed by Argon2.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use once_cell::sync::Lazy;

use crate::config::MIN_PASSWORD_LENGTH;
use crate::errors::{AppError, AppResult};

/// Well-formed hash checked when the account does not exist, so unknown
/// emails cost the same Argon2 work as wrong passwords.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(b"helpora-timing-equalizer", &salt)
        .map(|hash| hash.to_string())
        .ok()
});

/// An Argon2 PHC string. Plain text never leaves `hash`.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

impl Password {
    /// Hash a new password after enforcing the length policy.
    pub fn hash(plain_text: &str) -> AppResult<Self> {
        if plain_text.chars().count() < MIN_PASSWORD_LENGTH as usize {
            return Err(AppError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }

        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(plain_text.as_bytes(), &salt)
            .map_err(|e| AppError::internal(format!("Password hash failed: {}", e)))?;
        Ok(Self(hash.to_string()))
    }

    /// Wrap a hash loaded from storage.
    pub fn from_hash(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Constant-work verification. Malformed hashes never match.
    pub fn verify(&self, plain_text: &str) -> bool {
        PasswordHash::new(&self.0)
            .map(|parsed| {
                Argon2::default()
                    .verify_password(plain_text.as_bytes(), &parsed)
                    .is_ok()
            })
            .unwrap_or(false)
    }

    /// Burn a verification against the dummy hash; always false.
    pub fn verify_against_dummy(plain_text: &str) -> bool {
        if let Some(hash) = DUMMY_HASH.as_deref() {
            let _ = Password::from_hash(hash).verify(plain_text);
        }
        false
    }
}
