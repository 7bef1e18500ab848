//! API error types and responses.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use priceflex_core::CoreError;
use priceflex_store::StoreError;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No valid session; the client is sent to the sign-in page.
    #[error("sign in required")]
    SignInRequired {
        /// Sign-in URL including the `redirect_url` back to the request.
        location: String,
    },

    /// Forbidden - the caller's tier does not allow the action.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Bad request - invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// A field failed validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// The offending field.
        field: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// Conflict - resource already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),

    /// External service error.
    #[error("external service error: {0}")]
    ExternalService(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ErrorResponse {
    fn new(code: &str, message: String, details: Option<serde_json::Value>) -> Json<Self> {
        Json(Self {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            Self::SignInRequired { location } => {
                tracing::debug!(location = %location, "Redirecting to sign in");
                let body = ErrorResponse::new("sign_in_required", "Sign in required".into(), None);
                return (StatusCode::SEE_OTHER, [(header::LOCATION, location)], body)
                    .into_response();
            }
            Self::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            Self::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                message,
                Some(serde_json::json!({ "field": field })),
            ),
            Self::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            Self::ExternalService(msg) => (
                StatusCode::BAD_GATEWAY,
                "external_service_error",
                msg,
                None,
            ),
        };

        (status, ErrorResponse::new(code, message, details)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => {
                Self::NotFound(format!("{entity} not found: {id}"))
            }
            StoreError::Conflict(msg) => Self::Conflict(msg),
            StoreError::Database(msg)
            | StoreError::Serialization(msg)
            | StoreError::Migration(msg) => Self::Internal(msg),
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { field, message } => Self::Validation { field, message },
            CoreError::InvalidId(_)
            | CoreError::UnknownTier(_)
            | CoreError::UnknownTimezone(_)
            | CoreError::DateOutOfRange(_) => Self::BadRequest(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_in_required_redirects() {
        let response = ApiError::SignInRequired {
            location: "/sign-in?redirect_url=%2Fv1%2Fdashboard".into(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/sign-in?redirect_url=%2Fv1%2Fdashboard"
        );
    }

    #[test]
    fn store_errors_map_to_status_codes() {
        let conflict: ApiError = StoreError::Conflict("duplicate".into()).into();
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let db: ApiError = StoreError::Database("connection reset".into()).into();
        assert_eq!(db.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let err: ApiError = CoreError::validation("name", "name is required").into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);

        let tz: ApiError = CoreError::UnknownTimezone("Mars/Olympus".into()).into();
        assert_eq!(tz.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
