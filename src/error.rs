use axum::extract::multipart::MultipartError;
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, ThisError)]
pub enum StorefrontError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    NotFound(String),

    #[error("Malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Ractor error: {0}")]
    RactorError(String),
}

impl StorefrontError {
    pub fn status(&self) -> StatusCode {
        match self {
            StorefrontError::Multipart(e) if e.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            StorefrontError::Validation(_) | StorefrontError::Multipart(_) => {
                StatusCode::BAD_REQUEST
            }
            StorefrontError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            StorefrontError::NotFound(_) => StatusCode::NOT_FOUND,
            StorefrontError::DatabaseError(_)
            | StorefrontError::Io(_)
            | StorefrontError::JsonError(_)
            | StorefrontError::RactorError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "store failure while handling request");
            "An internal server error occurred.".to_string()
        } else if status == StatusCode::PAYLOAD_TOO_LARGE {
            "Upload exceeds the maximum allowed size".to_string()
        } else {
            self.to_string()
        };
        (
            status,
            Json(ApiErrorResponse {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}

/// Body shared by every failed gateway response.
#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub success: bool,
    pub message: String,
}

/// Transport-level fetch failure (no response at all).
#[derive(Debug, Clone, ThisError, PartialEq, Eq)]
#[error("network request to {url} failed: {reason}")]
pub struct NetworkError {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, ThisError)]
pub enum WorkerError {
    #[error("install failed: asset {path} could not be fetched: {source}")]
    AssetFetch {
        path: String,
        #[source]
        source: NetworkError,
    },

    #[error("install failed: asset {path} returned status {status}")]
    AssetStatus { path: String, status: u16 },

    #[error("cache storage error: {0}")]
    CacheStorage(String),

    #[error("claiming clients failed: {0}")]
    ClaimFailed(String),

    #[error("worker is {0:?}; operation not allowed")]
    InvalidState(crate::worker::Lifecycle),

    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("generation {0} was superseded before it activated")]
    Superseded(String),

    #[error("worker unavailable: {0}")]
    Unavailable(String),
}

impl WorkerError {
    /// True for failures that happened while populating the install bucket.
    pub fn is_install_failure(&self) -> bool {
        matches!(
            self,
            WorkerError::AssetFetch { .. } | WorkerError::AssetStatus { .. }
        )
    }
}

#[derive(Debug, ThisError)]
pub enum ClientError {
    #[error(transparent)]
    Worker(#[from] WorkerError),

    #[error("invalid response body: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// The gateway answered with a failure body.
    #[error("{message}")]
    Rejected { status: u16, message: String },
}
