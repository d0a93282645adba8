use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use stay_core::BookingError;

#[derive(Debug)]
pub enum AppError {
    NotFoundError(String),
    /// Business-rule rejection. Reported as 403, as the rest of the platform does.
    ForbiddenError(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ForbiddenError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::InternalServerError(err) => {
                tracing::error!("Internal Server Error: {:#}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound(_) => AppError::NotFoundError(err.to_string()),
            BookingError::Conflict(_) => AppError::ForbiddenError(err.to_string()),
            BookingError::Store(source) => AppError::InternalServerError(anyhow::anyhow!(source)),
        }
    }
}
