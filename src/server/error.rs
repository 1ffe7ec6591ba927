//! HTTP error responses.

use crate::error::ArchiveError;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Errors returned by route handlers.
///
/// Every variant renders as `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// `userId` or `messages` missing or empty.
    #[error("Missing parameters")]
    MissingParameters,

    /// `aiText` missing or empty.
    #[error("Missing AI output")]
    MissingAiOutput,

    /// The body was rejected before reaching the handler (bad JSON,
    /// wrong content type, over the size limit).
    #[error("{message}")]
    Rejected {
        /// Status chosen by the extractor.
        status: StatusCode,
        /// Rejection text.
        message: String,
    },

    /// Archive assembly failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

impl ApiError {
    /// Returns the response status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameters | Self::MissingAiOutput => StatusCode::BAD_REQUEST,
            Self::Rejected { status, .. } => *status,
            Self::Archive(ArchiveError::EmptyInput) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Archive(ArchiveError::OversizedContent { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Archive(ArchiveError::Write(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "request rejected");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
