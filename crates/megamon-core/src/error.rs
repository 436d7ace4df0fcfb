//! Unified application error types for Mega Monitor.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// The requested resource was not found.
    NotFound,
    /// Input validation failed.
    Validation,
    /// A conflict occurred (duplicate entry, concurrent modification, etc.).
    Conflict,
    /// An internal server error occurred.
    Internal,
    /// A database error occurred.
    Database,
    /// A filesystem I/O error occurred.
    Storage,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// The service is temporarily unavailable.
    ServiceUnavailable,
    /// An extension manifest is absent, malformed, or missing required fields.
    ManifestInvalid,
    /// Backend and frontend manifests of one bundle disagree on identity.
    ManifestMismatch,
    /// An extension with the same name and version is already installed.
    DuplicateExtension,
    /// A backend entry module loaded but exposes no route provider.
    EntryPointMissing,
    /// A backend entry module could not be loaded at all.
    ImportFailure,
    /// A frontend component failed to load at render time.
    ComponentLoadFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Internal => write!(f, "INTERNAL"),
            Self::Database => write!(f, "DATABASE"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::ServiceUnavailable => write!(f, "SERVICE_UNAVAILABLE"),
            Self::ManifestInvalid => write!(f, "MANIFEST_INVALID"),
            Self::ManifestMismatch => write!(f, "MANIFEST_MISMATCH"),
            Self::DuplicateExtension => write!(f, "DUPLICATE_EXTENSION"),
            Self::EntryPointMissing => write!(f, "ENTRY_POINT_MISSING"),
            Self::ImportFailure => write!(f, "IMPORT_FAILURE"),
            Self::ComponentLoadFailure => write!(f, "COMPONENT_LOAD_FAILURE"),
        }
    }
}

/// The unified application error used throughout Mega Monitor.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls. This provides a single error type for
/// the entire application boundary.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a manifest-invalid error.
    pub fn manifest_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ManifestInvalid, message)
    }

    /// Create a manifest-mismatch error.
    pub fn manifest_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ManifestMismatch, message)
    }

    /// Create a duplicate-extension error.
    pub fn duplicate_extension(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateExtension, message)
    }

    /// Create an entry-point-missing error.
    pub fn entry_point_missing(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EntryPointMissing, message)
    }

    /// Create an import-failure error.
    pub fn import_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ImportFailure, message)
    }

    /// Create a component-load-failure error.
    pub fn component_load_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ComponentLoadFailure, message)
    }

    /// Create a service-unavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
