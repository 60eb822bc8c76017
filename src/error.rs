//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Startup-time schema and seed problems. Always fatal.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load: {0}")]
    Load(String),
    #[error("schema contains no entities")]
    EmptySchema,
    #[error("entity '{entity}' has no fields")]
    NoFields { entity: String },
    #[error("entity '{entity}' must have an 'id' field")]
    MissingIdField { entity: String },
    #[error("entity '{entity}': id field must be of type 'string'")]
    InvalidIdType { entity: String },
    #[error("{context} references unknown entity '{entity}'")]
    UnknownEntity { context: String, entity: String },
    #[error("duplicate custom route: {method} {path}")]
    DuplicateRoute { method: String, path: String },
    #[error("invalid custom route: {0}")]
    InvalidRoute(String),
    #[error("seed data: {0}")]
    SeedValidation(String),
    #[error("invalid response header: {0}")]
    InvalidHeader(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("entity type not found: {0}")]
    EntityTypeNotFound(String),
    #[error("entity not found: {entity}/{id}")]
    NotFound { entity: String, id: String },
    #[error("no auto-generated ids left for entity type {0}")]
    IdSpaceExhausted(String),
    #[error("store lock poisoned")]
    LockPoisoned,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("{}", route_not_matched_message(.path_known))]
    RouteNotMatched { path_known: bool },
    #[error("Content-Type must be application/json")]
    UnsupportedMediaType,
    #[error("{0}")]
    Internal(String),
}

fn route_not_matched_message(path_known: &bool) -> &'static str {
    if *path_known {
        "Method not allowed"
    } else {
        "Route not found"
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Store(StoreError::EntityTypeNotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::NotFound { .. }) => StatusCode::NOT_FOUND,
            AppError::Store(StoreError::IdSpaceExhausted(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Store(StoreError::LockPoisoned) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::RouteNotMatched { path_known: false } => StatusCode::NOT_FOUND,
            AppError::RouteNotMatched { path_known: true } => StatusCode::METHOD_NOT_ALLOWED,
            AppError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
