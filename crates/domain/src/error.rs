//! Unified error types for the domain layer
//!
//! Binding and resolution are deliberately forgiving (a missing node or
//! config entry is a no-op), so these errors only cover the places where a
//! caller needs to know *why* something produced nothing.

use thiserror::Error;

/// Unified error type for domain operations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    /// A manifest path segment could not be followed
    #[error("Path segment '{segment}' not found at depth {depth}")]
    PathNotFound { segment: String, depth: usize },

    /// History reported outputs but not for the configured output node
    #[error("Output node {0} missing from history outputs")]
    MissingOutputNode(String),

    /// Settings document could not be applied
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

impl DomainError {
    pub fn path_not_found(segment: impl ToString, depth: usize) -> Self {
        Self::PathNotFound {
            segment: segment.to_string(),
            depth,
        }
    }

    pub fn invalid_settings(msg: impl Into<String>) -> Self {
        Self::InvalidSettings(msg.into())
    }

    /// Check if this is a path lookup failure.
    pub fn is_path_not_found(&self) -> bool {
        matches!(self, Self::PathNotFound { .. })
    }
}
