//! Error-to-HTTP response conversion.
//!
//! Handlers return `Result<T, AppError>`; every error body has the shape
//! `{ "error", "kind", "diagnostic_id" }`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use clipforged_av::Outcome;
use clipforged_common::DiagnosticId;
use serde_json::json;

pub enum AppError {
    /// Resolution, build or staging failure.
    Engine(clipforged_av::Error),
    /// The engine ran (or tried to) and did not succeed.
    Execution {
        kind: &'static str,
        message: String,
        diagnostic_id: Option<DiagnosticId>,
    },
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl AppError {
    /// Error for an unsuccessful outcome.
    pub fn execution(outcome: &Outcome, diagnostic_id: Option<DiagnosticId>) -> Self {
        Self::Execution {
            kind: outcome.kind(),
            message: outcome.to_string(),
            diagnostic_id,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Engine(e) => match e {
                clipforged_av::Error::UnknownRecipe { .. } => StatusCode::NOT_FOUND,
                clipforged_av::Error::ToolNotFound { .. } => StatusCode::SERVICE_UNAVAILABLE,
                e if e.is_caller_error() => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Execution { kind: "TimedOut", .. } => StatusCode::GATEWAY_TIMEOUT,
            Self::Execution { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<clipforged_av::Error> for AppError {
    fn from(e: clipforged_av::Error) -> Self {
        Self::Engine(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let (message, kind, diagnostic_id) = match self {
            Self::Engine(e) => (e.to_string(), e.kind(), None),
            Self::Execution {
                kind,
                message,
                diagnostic_id,
            } => (message, kind, diagnostic_id),
            Self::BadRequest(m) => (m, "BadRequest", None),
            Self::NotFound(m) => (m, "NotFound", None),
            Self::Internal(m) => (m, "Internal", None),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %message, kind, "Request failed");
        }

        let body = json!({
            "error": message,
            "kind": kind,
            "diagnostic_id": diagnostic_id.map(|id| id.short()),
        });

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_recipe_produces_404() {
        let err = AppError::from(clipforged_av::Error::unknown_recipe("nope"));
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn caller_errors_produce_400() {
        let err = AppError::from(clipforged_av::Error::malformed("fps", "not a number"));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn render_error_produces_500() {
        let err = AppError::from(clipforged_av::Error::render("trim", "bad slot"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn timeout_produces_504() {
        let outcome = Outcome::TimedOut {
            output: String::new(),
        };
        let err = AppError::execution(&outcome, Some(DiagnosticId::new()));
        assert_eq!(err.into_response().status(), StatusCode::GATEWAY_TIMEOUT);
    }
}
