//! # Error Handling
//!
//! Custom error types for the prediction pipeline and their conversion to
//! HTTP responses.
//!
//! ## Error Categories:
//! - **InvalidInput**: The client sent a bad upload (missing filename,
//!   disallowed extension, out-of-range detection parameters) - 400
//! - **PredictionFailed**: The transcription engine raised during
//!   invocation - 500, with the engine's failure carried as context
//! - **NoArtifactProduced**: The engine completed without error but wrote
//!   no MIDI file - 500, distinct from PredictionFailed because it signals
//!   an output-contract mismatch rather than an engine exception
//! - **Internal**: Workspace creation/removal or other server-side I/O
//!   failures - 500
//!
//! All variants produce the same JSON envelope so API clients can handle
//! failures uniformly:
//! ```json
//! {
//!   "error": {
//!     "type": "prediction_failed",
//!     "message": "...",
//!     "timestamp": "2025-01-01T12:00:00Z"
//!   }
//! }
//! ```

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Error taxonomy for the audio-to-MIDI service.
#[derive(Debug)]
pub enum AppError {
    /// Missing filename, disallowed extension, or bad detection parameters
    InvalidInput(String),

    /// The external transcription engine failed; the cause is carried as
    /// opaque context and never interpreted further
    PredictionFailed(String),

    /// Engine run succeeded but the output directory holds no MIDI file
    NoArtifactProduced,

    /// Workspace or other server-side failures (disk, permissions)
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AppError::PredictionFailed(msg) => write!(f, "Prediction failed: {}", msg),
            AppError::NoArtifactProduced => write!(f, "No MIDI file generated"),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let (status, error_type, message) = match self {
            AppError::InvalidInput(msg) => (
                actix_web::http::StatusCode::BAD_REQUEST,
                "invalid_input",
                msg.clone(),
            ),
            AppError::PredictionFailed(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "prediction_failed",
                msg.clone(),
            ),
            AppError::NoArtifactProduced => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "no_artifact_produced",
                "No MIDI file generated".to_string(),
            ),
            AppError::Internal(msg) => (
                actix_web::http::StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                msg.clone(),
            ),
        };

        HttpResponse::build(status).json(json!({
            "error": {
                "type": error_type,
                "message": message,
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        }))
    }
}

/// Fallible internals use anyhow; anything that escapes uncategorized is a
/// server-side fault.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// `web::block` reports cancellation of the blocking pool as its own error;
/// the request cannot recover from that.
impl From<actix_web::error::BlockingError> for AppError {
    fn from(err: actix_web::error::BlockingError) -> Self {
        AppError::Internal(format!("Blocking task failed: {}", err))
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;

    #[test]
    fn test_client_errors_map_to_400() {
        let err = AppError::InvalidInput("no filename".to_string());
        assert_eq!(err.error_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_server_errors_map_to_500() {
        for err in [
            AppError::PredictionFailed("engine exploded".to_string()),
            AppError::NoArtifactProduced,
            AppError::Internal("disk full".to_string()),
        ] {
            assert_eq!(
                err.error_response().status(),
                StatusCode::INTERNAL_SERVER_ERROR
            );
        }
    }

    #[test]
    fn test_display_carries_cause() {
        let err = AppError::PredictionFailed("bad samples".to_string());
        assert_eq!(err.to_string(), "Prediction failed: bad samples");
    }
}
