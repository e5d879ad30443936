use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::engine::eligibility::DenyReason;
use crate::models::delivery::DeliveryStatus;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("validation: {0}")]
    Validation(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("order {0} already grabbed")]
    AlreadyGrabbed(uuid::Uuid),

    #[error("delivery is {actual:?}, expected {expected:?}")]
    WrongStatus {
        expected: DeliveryStatus,
        actual: DeliveryStatus,
    },

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("eligibility denied: {0}")]
    EligibilityDenied(DenyReason),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "validation",
            AppError::Conflict(_) => "conflict",
            AppError::AlreadyGrabbed(_) => "already_grabbed",
            AppError::WrongStatus { .. } => "wrong_status",
            AppError::Forbidden(_) => "forbidden",
            AppError::EligibilityDenied(_) => "eligibility_denied",
            AppError::Internal(_) => "internal",
        }
    }
}

impl From<DenyReason> for AppError {
    fn from(reason: DenyReason) -> Self {
        AppError::EligibilityDenied(reason)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) | AppError::AlreadyGrabbed(_) | AppError::WrongStatus { .. } => {
                StatusCode::CONFLICT
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::EligibilityDenied(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            AppError::EligibilityDenied(reason) => Json(json!({
                "error": self.to_string(),
                "code": self.code(),
                "reason": reason.code(),
            })),
            _ => Json(json!({
                "error": self.to_string(),
                "code": self.code(),
            })),
        };

        (status, body).into_response()
    }
}
