use axum::{http::StatusCode, response::IntoResponse, Json};

use super::types::ApiError;

#[derive(Debug)]
pub(crate) enum ApiFailure {
    InvalidRequest,
    UnknownPermission,
    Unauthorized,
    Forbidden { reason: String },
    NotFound,
    LimitReached,
    InvalidSync { reason: String },
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> axum::response::Response {
        match self {
            Self::InvalidRequest => (
                StatusCode::BAD_REQUEST,
                Json(ApiError {
                    error: "invalid_request",
                    reason: None,
                }),
            )
                .into_response(),
            Self::UnknownPermission => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiError {
                    error: "unknown_permission",
                    reason: None,
                }),
            )
                .into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(ApiError {
                    error: "unauthorized",
                    reason: None,
                }),
            )
                .into_response(),
            Self::Forbidden { reason } => (
                StatusCode::FORBIDDEN,
                Json(ApiError {
                    error: "forbidden",
                    reason: Some(reason),
                }),
            )
                .into_response(),
            Self::NotFound => (
                StatusCode::NOT_FOUND,
                Json(ApiError {
                    error: "not_found",
                    reason: None,
                }),
            )
                .into_response(),
            Self::LimitReached => (
                StatusCode::CONFLICT,
                Json(ApiError {
                    error: "limit_reached",
                    reason: None,
                }),
            )
                .into_response(),
            Self::InvalidSync { reason } => (
                StatusCode::BAD_REQUEST,
                Json(ApiError {
                    error: "invalid_sync_event",
                    reason: Some(reason),
                }),
            )
                .into_response(),
        }
    }
}

pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(true)
        .with_span_list(true)
        .init();
}
