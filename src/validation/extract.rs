use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::middleware::{ValidatedBody, ValidatedParams, ValidatedQuery};
use crate::errors::AppError;

/// Typed view of the validated body
#[derive(Debug, Clone)]
pub struct ValidBody<T>(pub T);

/// Typed view of the validated route parameters
#[derive(Debug, Clone)]
pub struct ValidParams<T>(pub T);

/// Typed view of the validated query
#[derive(Debug, Clone)]
pub struct ValidQuery<T>(pub T);

// A missing extension or a type that disagrees with its schema is a wiring
// defect, so both surface as unclassified errors.
fn deserialize<T: DeserializeOwned>(value: Option<Value>, part: &str) -> Result<T, AppError> {
    let value = value.ok_or_else(|| {
        AppError::Unclassified(anyhow::anyhow!(
            "no validated {part} on request; the route declares no {part} schema"
        ))
    })?;
    serde_json::from_value(value).map_err(|e| {
        AppError::Unclassified(anyhow::anyhow!("validated {part} does not match handler type: {e}"))
    })
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts.extensions.get::<ValidatedBody>().map(|v| v.0.clone());
        deserialize(value, "body").map(Self)
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts.extensions.get::<ValidatedParams>().map(|v| v.0.clone());
        deserialize(value, "params").map(Self)
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts.extensions.get::<ValidatedQuery>().map(|v| v.0.clone());
        deserialize(value, "query").map(Self)
    }
}
