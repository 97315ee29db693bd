//! Credential checks consumed by the login route
//!
//! Authorization policy lives outside this service; an [`Authenticator`]
//! only answers whether a credential pair is valid.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::errors::OperationalError;
use crate::utils::hash::{digests_match, sha256_hex};

/// Issued on a successful login
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Session, OperationalError>;
}

/// Checks against a single account from configuration
///
/// With no account configured every attempt is refused.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredAuthenticator {
    email: Option<String>,
    password_sha256: Option<String>,
}

impl ConfiguredAuthenticator {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            email: config.admin_email.clone(),
            password_sha256: config
                .admin_password_sha256
                .as_ref()
                .map(|digest| digest.to_ascii_lowercase()),
        }
    }
}

#[async_trait]
impl Authenticator for ConfiguredAuthenticator {
    async fn authenticate(&self, email: &str, password: &str) -> Result<Session, OperationalError> {
        let (Some(expected_email), Some(expected_digest)) = (&self.email, &self.password_sha256)
        else {
            return Err(OperationalError::unauthorized("Invalid credentials"));
        };

        let email_ok = expected_email.eq_ignore_ascii_case(email);
        let password_ok = digests_match(expected_digest, &sha256_hex(password));
        if !(email_ok && password_ok) {
            return Err(OperationalError::unauthorized("Invalid credentials"));
        }

        Ok(Session {
            token: Uuid::new_v4().simple().to_string(),
            email: expected_email.clone(),
            expires_at: Utc::now() + Duration::hours(12),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn authenticator() -> ConfiguredAuthenticator {
        ConfiguredAuthenticator::new(&AuthConfig {
            admin_email: Some("author@example.com".to_string()),
            admin_password_sha256: Some(sha256_hex("s3cret!").to_uppercase()),
        })
    }

    #[tokio::test]
    async fn test_valid_credentials() {
        let session = authenticator()
            .authenticate("Author@Example.com", "s3cret!")
            .await
            .unwrap();
        assert_eq!(session.email, "author@example.com");
        assert_eq!(session.token.len(), 32);
        assert!(session.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let err = authenticator()
            .authenticate("author@example.com", "guess")
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.code.as_str(), "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_unconfigured_refuses_everything() {
        let err = ConfiguredAuthenticator::default()
            .authenticate("anyone@example.com", "")
            .await
            .unwrap_err();
        assert_eq!(err.message, "Invalid credentials");
    }
}
