//! Error types for port operations.

/// Storage operation errors with context for debugging.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    /// Item not found - includes item type and name for actionable error messages.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Filesystem operation failed - includes operation name for tracing.
    #[error("IO error in {operation}: {message}")]
    Io {
        operation: &'static str,
        message: String,
    },

    /// Serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl RepoError {
    /// Create a NotFound error with item type and name context.
    pub fn not_found(entity_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity_type,
            id: id.to_string(),
        }
    }

    /// Create an Io error with operation context.
    pub fn io(operation: &'static str, message: impl ToString) -> Self {
        Self::Io {
            operation,
            message: message.to_string(),
        }
    }

    /// Create a Serialization error.
    pub fn serialization(message: impl ToString) -> Self {
        Self::Serialization(message.to_string())
    }

    /// Check if this is a NotFound error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Errors talking to the ComfyUI backend.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ComfyError {
    /// The request never produced a response (connection refused, reset, …)
    #[error("Request to {endpoint} failed: {message}")]
    Request {
        endpoint: &'static str,
        message: String,
    },

    /// The backend answered with a non-success status.
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    /// The response body did not have the expected shape.
    #[error("Invalid response from {endpoint}: {message}")]
    InvalidResponse {
        endpoint: &'static str,
        message: String,
    },
}

impl ComfyError {
    pub fn request(endpoint: &'static str, message: impl ToString) -> Self {
        Self::Request {
            endpoint,
            message: message.to_string(),
        }
    }

    pub fn invalid_response(endpoint: &'static str, message: impl ToString) -> Self {
        Self::InvalidResponse {
            endpoint,
            message: message.to_string(),
        }
    }
}
