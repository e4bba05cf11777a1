//! HTTP error rendering
//!
//! Every failure becomes `{"error": code, "message": text, "details": ...}`.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use grading_scenario::ScenarioError;
use serde::Serialize;
use serde_json::{json, Value};

/// API error
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Engine failure
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    /// Request that could not be decoded
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Resource other than a scenario id not found
    #[error("{0}")]
    NotFound(String),

    /// Server-side failure outside the engine
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Stable machine-readable code
    pub error: &'static str,
    /// Human-readable message
    pub message: String,
    /// Structured context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ApiError {
    /// HTTP status for this error
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Scenario(e) => match e {
                ScenarioError::Validation(_)
                | ScenarioError::Ladder(_)
                | ScenarioError::InvalidRequest(_)
                | ScenarioError::LadderMismatch { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                ScenarioError::NotFound(_) => StatusCode::NOT_FOUND,
                ScenarioError::InvalidTransition { .. }
                | ScenarioError::ConcurrentApplyConflict { .. }
                | ScenarioError::CurrentAlreadySet { .. } => StatusCode::CONFLICT,
                ScenarioError::Persistence(_) | ScenarioError::Config(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Response body for this error
    #[must_use]
    pub fn body(&self) -> ErrorBody {
        let (error, details) = match self {
            Self::Scenario(e) => (e.code(), scenario_details(e)),
            Self::BadRequest(_) => ("bad_request", None),
            Self::NotFound(_) => ("not_found", None),
            Self::Internal(_) => ("internal_error", None),
        };
        ErrorBody {
            error,
            message: self.to_string(),
            details,
        }
    }
}

fn scenario_details(error: &ScenarioError) -> Option<Value> {
    match error {
        ScenarioError::Validation(errors) => serde_json::to_value(errors).ok(),
        ScenarioError::InvalidTransition { id, status, action } => Some(json!({
            "id": id,
            "status": status,
            "action": action,
        })),
        ScenarioError::ConcurrentApplyConflict {
            id,
            expected,
            actual,
        } => Some(json!({
            "id": id,
            "expected_current": expected,
            "actual_current": actual,
        })),
        ScenarioError::CurrentAlreadySet { current } => Some(json!({ "current": current })),
        ScenarioError::LadderMismatch { expected, found } => Some(json!({
            "expected": expected,
            "found": found,
        })),
        _ => None,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        } else {
            tracing::debug!("request rejected ({}): {}", status, self);
        }
        (status, Json(self.body())).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}
