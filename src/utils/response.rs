use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::services::matching::MatchingError;
use crate::store::StoreError;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

/// Application error type. Wraps both transport-level failures (bad auth,
/// malformed body) and domain failures from the matching core.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: String,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ApiError {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<MatchingError> for AppError {
    fn from(e: MatchingError) -> Self {
        match e {
            MatchingError::BadRequest(m) => AppError::bad_request(m),
            MatchingError::UnknownInstrument(t) => AppError::not_found(format!("unknown instrument {t}")),
            MatchingError::UnknownUser(id) => AppError::not_found(format!("unknown user {id}")),
            MatchingError::UnknownOrder(id) => AppError::not_found(format!("unknown order {id}")),
            MatchingError::InsufficientFunds => {
                AppError::new(StatusCode::BAD_REQUEST, "INSUFFICIENT_FUNDS", "insufficient balance")
            }
            MatchingError::BadState => {
                AppError::new(StatusCode::BAD_REQUEST, "BAD_STATE", "order is not in a cancellable state")
            }
            MatchingError::Conflict(m) => AppError::new(StatusCode::BAD_REQUEST, "CONFLICT", m),
            MatchingError::SystemError(m) => AppError::internal(m),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        AppError::internal(e.to_string())
    }
}
