//! Error types for the query catalog.
//!
//! Defines the main error enum used throughout the crate. Every stage of a
//! catalog run (lookup, binding, execution) surfaces one of these variants.

use std::time::Duration;
use thiserror::Error;

/// Main error type for catalog operations.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// No template is registered under the requested name.
    #[error("Unknown template: '{0}'")]
    UnknownTemplate(String),

    /// A template with the same name was already registered.
    #[error("Duplicate template: '{0}' is already registered")]
    DuplicateTemplate(String),

    /// A declared parameter without a default was not supplied.
    #[error("Missing parameter '{parameter}' for template '{template}'")]
    MissingParameter { template: String, parameter: String },

    /// A supplied parameter is not declared on the template.
    #[error("Unknown parameter '{parameter}' for template '{template}'")]
    UnknownParameter { template: String, parameter: String },

    /// A supplied value cannot be coerced to the declared type.
    #[error("Type mismatch for parameter '{parameter}': expected {expected}, got {actual}")]
    TypeMismatch {
        parameter: String,
        expected: String,
        actual: String,
    },

    /// The template definition violates a catalog invariant.
    #[error("Invalid template '{template}': {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// The backend rejected or failed the query. The message is the backend's own diagnostic.
    #[error("Query error: {0}")]
    BackendQuery(String),

    /// The backend did not answer within the allotted time.
    #[error("Query timed out after {}s", .0.as_secs_f64())]
    BackendTimeout(Duration),

    /// Database connection errors (host unreachable, auth failed, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration errors (invalid config file, unreadable catalog, etc.)
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CatalogError {
    /// Creates an invalid template error.
    pub fn invalid_template(template: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTemplate {
            template: template.into(),
            reason: reason.into(),
        }
    }

    /// Creates a backend query error with the given message.
    pub fn query(msg: impl Into<String>) -> Self {
        Self::BackendQuery(msg.into())
    }

    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::UnknownTemplate(_) | Self::DuplicateTemplate(_) | Self::InvalidTemplate { .. } => {
                "Catalog Error"
            }
            Self::MissingParameter { .. }
            | Self::UnknownParameter { .. }
            | Self::TypeMismatch { .. } => "Parameter Error",
            Self::BackendQuery(_) => "Query Error",
            Self::BackendTimeout(_) => "Timeout",
            Self::Connection(_) => "Connection Error",
            Self::Config(_) => "Configuration Error",
        }
    }

    /// Returns true for errors raised by the backend after submission.
    ///
    /// Only these are candidates for an explicit retry policy; everything
    /// else is a caller mistake that a retry cannot fix.
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::BackendQuery(_) | Self::BackendTimeout(_))
    }
}

/// Result type alias using CatalogError.
pub type Result<T> = std::result::Result<T, CatalogError>;
