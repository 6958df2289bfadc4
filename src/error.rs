//! Error types for mapkv
//!
//! Provides a unified error type for all container operations.

use thiserror::Error;

/// Result type alias using MapError
pub type Result<T> = std::result::Result<T, MapError>;

/// Unified error type for mapkv operations
#[derive(Debug, Error)]
pub enum MapError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Lookup Errors
    // -------------------------------------------------------------------------
    #[error("Entry not found: {0}")]
    NotFound(String),

    #[error("Entry already exists: {0}")]
    AlreadyExists(String),

    // -------------------------------------------------------------------------
    // Permission Errors
    // -------------------------------------------------------------------------
    #[error("Container is opened read-only")]
    ReadOnly,

    // -------------------------------------------------------------------------
    // Argument Errors
    // -------------------------------------------------------------------------
    #[error("Entry data must not be empty")]
    EmptyValue,

    #[error("Invalid entry name: {0}")]
    InvalidName(String),

    #[error("Buffer too small: entry needs {needed} bytes, buffer has {available}")]
    BufferTooSmall { needed: usize, available: usize },

    // -------------------------------------------------------------------------
    // Format Errors
    // -------------------------------------------------------------------------
    #[error("Invalid container format: {0}")]
    InvalidFormat(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Unrecoverable Errors
    // -------------------------------------------------------------------------
    #[error("Mapping failed: {0}")]
    Mapping(String),

    #[error("Container poisoned by an earlier mapping failure")]
    Poisoned,
}

impl MapError {
    /// Whether the error left the container unusable
    ///
    /// Mapping and resize failures in the middle of a mutation cannot be
    /// rolled back, so the container refuses further work afterwards.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MapError::Mapping(_) | MapError::Poisoned)
    }

    /// Whether the error is a plain "no such entry" miss
    pub fn is_not_found(&self) -> bool {
        matches!(self, MapError::NotFound(_))
    }
}
