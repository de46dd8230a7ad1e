use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use casebook_core::error::CoreError;
use casebook_db::StoreError;
use serde_json::json;

/// Application-level error type for HTTP handlers.
///
/// Wraps [`CoreError`] for domain errors and adds HTTP-specific variants.
/// Implements [`IntoResponse`] to produce `{ "error": ..., "code": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Core(core) => AppError::Core(core),
            StoreError::Database(db) => AppError::Database(db),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                AppError::Core(CoreError::Validation(rejection.body_text()))
            }
            other => AppError::BadRequest(other.body_text()),
        }
    }
}

impl AppError {
    /// HTTP status, stable error code, and client-facing message.
    fn classify(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Core(core) => match core {
                CoreError::NotFound { entity, id } => (
                    StatusCode::NOT_FOUND,
                    "NOT_FOUND",
                    format!("{entity} with id {id} not found"),
                ),
                CoreError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
                }
                CoreError::InvalidOrder(msg) => (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "INVALID_ORDER",
                    msg.clone(),
                ),
                CoreError::ConcurrentModification { entity, id } => (
                    StatusCode::CONFLICT,
                    "CONCURRENT_MODIFICATION",
                    format!("{entity} with id {id} was modified concurrently, please retry"),
                ),
                CoreError::Unauthorized(msg) => {
                    (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone())
                }
                CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
                CoreError::InvalidVersionFormat(_) | CoreError::Internal(_) => {
                    tracing::error!(error = %core, "Internal core error");
                    internal()
                }
            },
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.classify();
        let body = json!({
            "error": message,
            "code": code,
        });
        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

/// Classify a sqlx error into an HTTP status, error code, and message.
///
/// - `RowNotFound` maps to 404.
/// - Unique violations on `uq_` constraints map to 409.
/// - Everything else maps to 500 with a sanitized message.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    match err {
        sqlx::Error::RowNotFound => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        ),
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unknown");
                if constraint.starts_with("uq_") {
                    return (
                        StatusCode::CONFLICT,
                        "CONFLICT",
                        format!("Duplicate value violates unique constraint: {constraint}"),
                    );
                }
            }
            tracing::error!(error = %db_err, "Database error");
            internal()
        }
        other => {
            tracing::error!(error = %other, "Database error");
            internal()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_and_code(err: AppError) -> (StatusCode, &'static str) {
        let (status, code, _) = err.classify();
        (status, code)
    }

    #[test]
    fn domain_errors_map_to_client_statuses() {
        let cases = [
            (
                CoreError::NotFound { entity: "test_case", id: 1 },
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (
                CoreError::Validation("action must not be empty".into()),
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
            ),
            (
                CoreError::InvalidOrder("missing ids".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
                "INVALID_ORDER",
            ),
            (
                CoreError::ConcurrentModification { entity: "fixture", id: 2 },
                StatusCode::CONFLICT,
                "CONCURRENT_MODIFICATION",
            ),
            (
                CoreError::Unauthorized("no token".into()),
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
            ),
            (
                CoreError::Forbidden("viewer".into()),
                StatusCode::FORBIDDEN,
                "FORBIDDEN",
            ),
        ];

        for (core, status, code) in cases {
            assert_eq!(status_and_code(AppError::Core(core)), (status, code));
        }
    }

    #[test]
    fn malformed_stored_version_is_internal() {
        let (status, code, message) =
            AppError::Core(CoreError::InvalidVersionFormat("1.x".into())).classify();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "INTERNAL_ERROR");
        assert!(!message.contains("1.x"));
    }

    #[test]
    fn store_errors_unwrap_into_app_errors() {
        let err: AppError = StoreError::Core(CoreError::NotFound { entity: "fixture", id: 5 }).into();
        assert!(matches!(err, AppError::Core(CoreError::NotFound { id: 5, .. })));

        let err: AppError = StoreError::Database(sqlx::Error::RowNotFound).into();
        assert_eq!(status_and_code(err), (StatusCode::NOT_FOUND, "NOT_FOUND"));
    }

    #[test]
    fn json_body_rejections_are_validation_errors() {
        #[derive(Debug, serde::Deserialize)]
        #[allow(dead_code)]
        struct Payload {
            action: String,
        }

        let wrong_shape = axum::Json::<Payload>::from_bytes(br#"{"data":"x"}"#).unwrap_err();
        let (status, code, message) = AppError::from(wrong_shape).classify();
        assert_eq!((status, code), (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"));
        assert!(message.contains("action"), "message: {message}");

        let broken = axum::Json::<Payload>::from_bytes(b"{\"action\":").unwrap_err();
        assert_eq!(
            status_and_code(broken.into()),
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
        );
    }
}
