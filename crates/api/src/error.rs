use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use vitals_core::error::{CoreError, QueueError, StoreError};
use vitals_pipeline::ServiceError;

/// Application-level error type for HTTP handlers.
///
/// Implements [`IntoResponse`] to produce consistent JSON error responses
/// of the form `{ "error": ..., "code": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A domain-level error from `vitals_core`.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// An error from the vitals service (queue, store, or validation).
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// A bad request with a human-readable message.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Convenience type alias for handler return values.
pub type AppResult<T> = Result<T, AppError>;

type ErrorParts = (StatusCode, &'static str, String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Service(ServiceError::Core(core)) => classify_core_error(core),
            AppError::Service(ServiceError::Queue(err)) => classify_queue_error(err),
            AppError::Service(ServiceError::Store(err)) => classify_store_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };

        let body = json!({
            "error": message,
            "code": code,
        });

        (status, axum::Json(body)).into_response()
    }
}

fn internal() -> ErrorParts {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An internal error occurred".to_string(),
    )
}

fn classify_core_error(err: &CoreError) -> ErrorParts {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal()
        }
    }
}

/// Enqueue failures are a service-unavailable condition: the ingest
/// request fails fast instead of dropping data.
fn classify_queue_error(err: &QueueError) -> ErrorParts {
    match err {
        QueueError::Unavailable(msg) => {
            tracing::error!(error = %msg, "Queue unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "QUEUE_UNAVAILABLE",
                "The ingest queue is unavailable, please retry".to_string(),
            )
        }
        QueueError::NotFound(id) => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("Job with id {id} not found"),
        ),
        QueueError::Serialization(msg) => {
            tracing::error!(error = %msg, "Job payload serialization failed");
            internal()
        }
    }
}

fn classify_store_error(err: &StoreError) -> ErrorParts {
    match err {
        StoreError::Known { code, message } => {
            tracing::warn!(code = %code, error = %message, "Store rejected request");
            (StatusCode::BAD_REQUEST, "STORE_REJECTED", message.clone())
        }
        StoreError::Connectivity(msg) => {
            tracing::error!(error = %msg, "Store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
                "The data store is unavailable, please retry".to_string(),
            )
        }
        StoreError::Unknown(msg) => {
            tracing::error!(error = %msg, "Store failure");
            internal()
        }
    }
}
