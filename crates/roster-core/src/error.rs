//! Error types for the Roster application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the entire Roster application.
///
/// This provides typed, structured error variants with automatic conversion
/// from common error types via the `From` trait.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RosterError {
    /// A required field was empty after trimming
    #[error("Validation error: '{field}' must not be empty")]
    Validation { field: String },

    /// Authentication failure, carries the capability's message verbatim
    #[error("Auth error: {0}")]
    Auth(String),

    /// Terminal failure of a live snapshot stream
    #[error("Stream error: {0}")]
    Stream(String),

    /// Failure to append a document to the remote collection
    #[error("Write error: {0}")]
    Write(String),

    /// Local profile cache failure
    #[error("Cache error: {0}")]
    Cache(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "JSON", "TOML", etc.
        message: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RosterError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Validation error for the given field name
    pub fn validation(field: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
        }
    }

    /// Creates an Auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// Creates a Stream error
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream(message.into())
    }

    /// Creates a Write error
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write(message.into())
    }

    /// Creates a Cache error
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a Validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this is an Auth error
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// Check if this is a Stream error
    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// Check if this is a Write error
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for RosterError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for RosterError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for RosterError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for RosterError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, RosterError>`.
pub type Result<T> = std::result::Result<T, RosterError>;
