//! Domain error types for server operations.
//!
//! - `StartupError`: failures while bringing the process up, reported
//!   through `kateglo_core::Result`
//! - `ApiError`: failures of JSON API handlers, rendered as
//!   `{ "success": false, "message": ... }`

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kateglo_rbac::RbacError;
use serde_json::json;
use sqlx::error::ErrorKind;
use std::fmt;

/// Errors raised during process startup.
#[derive(Debug)]
pub enum StartupError {
    /// Configuration could not be loaded.
    Configuration { details: String },
    /// The database could not be reached or migrated.
    Database { details: String },
    /// The outbound HTTP client could not be built.
    HttpClient { details: String },
    /// The listener could not be bound or the server stopped with an error.
    Serve { details: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration { details } => write!(f, "failed to load configuration: {details}"),
            Self::Database { details } => write!(f, "database setup failed: {details}"),
            Self::HttpClient { details } => write!(f, "failed to build HTTP client: {details}"),
            Self::Serve { details } => write!(f, "server error: {details}"),
        }
    }
}

impl std::error::Error for StartupError {}

/// Errors returned by JSON API handlers.
#[derive(Debug)]
pub enum ApiError {
    /// The request body or path failed validation.
    Validation { message: String },
    /// The addressed entity does not exist.
    NotFound { entity: &'static str },
    /// A unique constraint rejected the write.
    Conflict { details: String },
    /// A foreign key named a row that does not exist.
    InvalidReference { details: String },
    /// A storage operation failed.
    Database { details: String },
}

impl ApiError {
    /// Classifies a storage error; details are logged, never returned.
    pub fn database(error: sqlx::Error) -> Self {
        let kind = error.as_database_error().map(|db| db.kind());
        Self::from_storage(kind, error.to_string())
    }

    fn from_storage(kind: Option<ErrorKind>, details: String) -> Self {
        match kind {
            Some(ErrorKind::UniqueViolation) => Self::Conflict { details },
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference { details },
            _ => Self::Database { details },
        }
    }
}

impl From<RbacError> for ApiError {
    fn from(error: RbacError) -> Self {
        Self::Validation {
            message: error.to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { message } => write!(f, "{message}"),
            Self::NotFound { entity } => write!(f, "{entity} not found"),
            Self::Conflict { details } => write!(f, "duplicate entry: {details}"),
            Self::InvalidReference { details } => write!(f, "invalid reference: {details}"),
            Self::Database { details } => write!(f, "database error: {details}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::Validation { message } => (StatusCode::BAD_REQUEST, message.clone()),
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, self.to_string()),
            Self::Conflict { details } => {
                tracing::debug!(error = %details, "Unique constraint violated");
                (StatusCode::CONFLICT, "Duplicate entry".to_string())
            }
            Self::InvalidReference { details } => {
                tracing::debug!(error = %details, "Foreign key violated");
                (StatusCode::BAD_REQUEST, "Invalid reference".to_string())
            }
            Self::Database { details } => {
                tracing::error!(error = %details, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}
