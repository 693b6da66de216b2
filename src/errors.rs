use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("External service error: {0}")]
    ExternalServiceError(String),

    #[error("Dataset error: {0}")]
    DatasetError(#[from] crate::data::loader::LoadError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::ExternalServiceError(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::DatasetError(err) => {
                tracing::error!("Dataset error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Dataset failed to load: {}", err),
                )
            }
        };

        (status, axum::Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<crate::services::filter::InvalidCriteria> for AppError {
    fn from(err: crate::services::filter::InvalidCriteria) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<crate::services::weather::WeatherError> for AppError {
    fn from(err: crate::services::weather::WeatherError) -> Self {
        AppError::ExternalServiceError(format!("Weather fetch failed: {}", err))
    }
}
