use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    MethodNotAllowed(String),

    /// The delivery is not in a state the operation can act on. Reported to
    /// the caller as a rejection, not a failure.
    #[error("{0}")]
    StateConflict(String),

    #[error("{0}")]
    Configuration(String),

    #[error("no available drivers found")]
    NoDriversAvailable,

    #[error("no drivers within {max_radius_km} km (closest is {closest_km:.2} km away)")]
    DriversTooFar { closest_km: f64, max_radius_km: f64 },

    #[error("{0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::StateConflict(_) => StatusCode::BAD_REQUEST,
            AppError::Configuration(_) => StatusCode::BAD_REQUEST,
            AppError::NoDriversAvailable => StatusCode::NOT_FOUND,
            AppError::DriversTooFar { .. } => StatusCode::NOT_FOUND,
            AppError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::NotFound(_) => "not_found",
            AppError::MethodNotAllowed(_) => "method_not_allowed",
            AppError::StateConflict(_) => "invalid_state",
            AppError::Configuration(_) => "configuration_error",
            AppError::NoDriversAvailable => "no_drivers",
            AppError::DriversTooFar { .. } => "drivers_too_far",
            AppError::Upstream(_) => "upstream_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    /// Label used for the `outcome` dimension of the pairing metrics.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            AppError::StateConflict(_) => "already_handled",
            AppError::NoDriversAvailable => "no_drivers",
            AppError::DriversTooFar { .. } => "too_far",
            AppError::Validation(_)
            | AppError::NotFound(_)
            | AppError::MethodNotAllowed(_)
            | AppError::Unauthorized(_) => "rejected",
            AppError::Configuration(_) | AppError::Upstream(_) | AppError::Internal(_) => "error",
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Upstream(format!("storage error: {err}"))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if matches!(self, AppError::Upstream(_) | AppError::Internal(_)) {
            tracing::error!(error = %self, "request failed");
        }

        let mut body = json!({
            "ok": false,
            "error": self.code(),
            "message": self.to_string(),
        });

        match &self {
            AppError::NoDriversAvailable => {
                body["drivers_found"] = Value::from(0);
            }
            AppError::DriversTooFar {
                closest_km,
                max_radius_km,
            } => {
                body["closest_driver_distance"] = Value::from(*closest_km);
                body["max_radius"] = Value::from(*max_radius_km);
            }
            _ => {}
        }

        (self.status_code(), Json(body)).into_response()
    }
}
