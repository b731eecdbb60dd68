//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// One entry of the `errors` array. `field` is set for per-attribute violations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        FieldError {
            message: message.into(),
            field: None,
        }
    }

    pub fn on_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            message: message.into(),
            field: Some(field.into()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse: {0}")]
    Parse(#[source] serde_json::Error),
}

/// Failures reported by a storage model.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("validation failed")]
    Validation(Vec<FieldError>),
    #[error("unique constraint violated")]
    UniqueConstraint(Vec<FieldError>),
    #[error("foreign key constraint: {0}")]
    ForeignKey(String),
    #[error("database: {0}")]
    Database(String),
    #[error("{0}")]
    Other(String),
}

/// Error raised by a caller-supplied hook.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum CrudError {
    #[error("{0}")]
    NotFound(String),
    /// Raised by the controller factory, never at request time.
    #[error("invalid model: {0}")]
    InvalidModel(String),
    #[error("validation failed")]
    ValidationFailed(Vec<FieldError>),
    #[error("unique constraint violated")]
    UniqueConstraintViolated(Vec<FieldError>),
    #[error("foreign key constraint error")]
    ForeignKeyViolated,
    #[error("{0}")]
    Database(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("request body too large")]
    PayloadTooLarge,
    #[error("{0}")]
    Unknown(String),
}

impl From<StorageError> for CrudError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Validation(v) => CrudError::ValidationFailed(v),
            StorageError::UniqueConstraint(v) => CrudError::UniqueConstraintViolated(v),
            StorageError::ForeignKey(_) => CrudError::ForeignKeyViolated,
            StorageError::Database(m) => CrudError::Database(m),
            StorageError::Other(m) => CrudError::Unknown(m),
        }
    }
}

impl CrudError {
    /// The update path reports database errors as unprocessable input.
    pub fn on_update(self) -> Self {
        match self {
            CrudError::Database(m) => CrudError::ValidationFailed(vec![FieldError::new(m)]),
            other => other,
        }
    }

    /// The list path does not distinguish failure kinds.
    pub fn generic(self) -> Self {
        match self {
            CrudError::Unknown(_) => self,
            other => CrudError::Unknown(other.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CrudError::NotFound(_) => StatusCode::NOT_FOUND,
            CrudError::ValidationFailed(_) | CrudError::UniqueConstraintViolated(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            CrudError::ForeignKeyViolated | CrudError::BadRequest(_) => StatusCode::BAD_REQUEST,
            CrudError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            CrudError::InvalidModel(_) | CrudError::Database(_) | CrudError::Unknown(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn errors(&self) -> Vec<FieldError> {
        match self {
            CrudError::ValidationFailed(v) | CrudError::UniqueConstraintViolated(v) if !v.is_empty() => {
                v.clone()
            }
            other => vec![FieldError::new(other.to_string())],
        }
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub errors: Vec<FieldError>,
}

impl IntoResponse for CrudError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(error = %self, "request failed");
        }
        let body = ErrorBody {
            errors: self.errors(),
        };
        (status, Json(body)).into_response()
    }
}
