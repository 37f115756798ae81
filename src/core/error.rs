//! Typed error handling for the catalog service
//!
//! # Error Categories
//!
//! - [`StorageError`]: connecting to or querying the document store
//! - [`CatalogError`]: listing and report operations (wraps storage errors)
//! - [`ConfigError`]: loading configuration from the environment
//!
//! `CatalogError` converts into an HTTP response. Clients only ever see the
//! generic [`ErrorResponse::server_error`] body; the detail goes to the log.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message returned to clients for every server-side failure
pub const SERVER_ERROR_MESSAGE: &str = "Server error";

/// Errors raised by storage backends
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not be reached or rejected the handshake
    #[error("failed to connect to {backend}: {message}")]
    Connection { backend: String, message: String },

    /// A pipeline could not be executed
    #[error("aggregation on '{collection}' failed: {message}")]
    Query { collection: String, message: String },

    /// A pipeline could not be expressed in the backend's query language
    #[error("failed to translate pipeline: {message}")]
    Translation { message: String },
}

impl StorageError {
    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::Connection { .. } => "STORAGE_CONNECTION_ERROR",
            StorageError::Query { .. } => "STORAGE_QUERY_ERROR",
            StorageError::Translation { .. } => "STORAGE_TRANSLATION_ERROR",
        }
    }
}

/// Errors raised by catalog operations
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A document returned by the store does not have the expected shape
    #[error("failed to decode {what}: {message}")]
    Decode { what: &'static str, message: String },
}

impl CatalogError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            CatalogError::Storage(e) => e.error_code(),
            CatalogError::Decode { .. } => "DECODE_ERROR",
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        tracing::error!(code = self.error_code(), error = %self, "request failed");
        (self.status_code(), Json(ErrorResponse::server_error())).into_response()
    }
}

/// Errors raised while reading configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(String),

    #[error("invalid value for {name}: {message}")]
    Invalid { name: String, message: String },
}

/// Error body for HTTP responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

impl ErrorResponse {
    pub fn server_error() -> Self {
        Self {
            message: SERVER_ERROR_MESSAGE.to_string(),
        }
    }
}
