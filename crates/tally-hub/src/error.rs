use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tally_core::ValidationError;
use tally_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("persistence error: {0}")]
    Persistence(#[from] StorageError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl HubError {
    pub fn status(&self) -> StatusCode {
        match self {
            HubError::Validation(_) => StatusCode::BAD_REQUEST,
            HubError::Persistence(_) | HubError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Reasons the hub could not start or stopped serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid listen address {addr:?}: {source}")]
    Addr {
        addr: String,
        source: std::net::AddrParseError,
    },
    #[error("failed to open counter store: {0}")]
    Store(#[from] StorageError),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(std::io::Error),
}
