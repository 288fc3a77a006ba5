//! Custom Axum extractors
//!
//! Each maps its rejection onto `AppError` so clients always get the
//! structured error body.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::{request::Parts, StatusCode};
use axum::Json;
use gazette_common::errors::AppError;
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::AppState;

/// JSON body that has been deserialized and validated
pub struct ValidJson<T>(pub T);

impl<T> FromRequest<AppState> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &AppState) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| json_error(rejection, state.config.extraction.max_document_bytes))?;

        value.validate().map_err(validation_error)?;
        Ok(Self(value))
    }
}

fn json_error(rejection: JsonRejection, limit: usize) -> AppError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        // Streamed bodies are cut off as soon as they pass the limit
        return AppError::PayloadTooLarge {
            size: limit.saturating_add(1),
            limit,
        };
    }

    AppError::InvalidFormat {
        message: rejection.body_text(),
    }
}

/// Turn validator errors into a validation error naming the first bad field
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let field = errors
        .field_errors()
        .keys()
        .min()
        .map(|k| k.to_string());

    AppError::Validation {
        message: errors.to_string(),
        field,
    }
}

/// Query string parameters
pub struct ValidQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::Validation {
                message: rejection.body_text(),
                field: None,
            })?;

        Ok(Self(value))
    }
}

/// Extract and validate a UUID from path
pub struct ValidUuid(pub Uuid);

impl<S> FromRequestParts<S> for ValidUuid
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::Validation {
                message: rejection.body_text(),
                field: Some("id".to_string()),
            })?;

        let uuid = Uuid::parse_str(&id).map_err(|_| AppError::Validation {
            message: format!("'{}' is not a valid UUID", id),
            field: Some("id".to_string()),
        })?;

        Ok(Self(uuid))
    }
}
