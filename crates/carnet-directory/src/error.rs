//! Directory error types
//!
//! Error definitions with transient/permanent classification.

use thiserror::Error;

/// Error that can occur while talking to an address-book directory.
#[derive(Debug, Error)]
pub enum DirectoryError {
    // Connectivity errors (usually transient)
    /// Failed to establish a session with the directory service.
    #[error("connection failed: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Remote call timed out.
    #[error("request timeout after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Directory service is temporarily unavailable.
    #[error("directory unavailable: {message}")]
    Unavailable { message: String },

    /// Directory service throttled the caller.
    #[error("request throttled by the directory service")]
    Throttled { retry_after_secs: Option<u64> },

    // Session errors (permanent, re-authentication required)
    /// The directory session is no longer valid.
    #[error("directory session expired")]
    SessionExpired,

    /// The caller lacks the right to perform the operation.
    #[error("permission denied for {operation}")]
    PermissionDenied { operation: String },

    // Object errors (permanent)
    /// Entry not found in the directory.
    #[error("entry not found: {identifier}")]
    EntryNotFound { identifier: String },

    /// Distribution group not found.
    #[error("group not found: {name}")]
    GroupNotFound { name: String },

    /// An object with the same identifier already exists.
    #[error("object already exists: {identifier}")]
    AlreadyExists { identifier: String },

    /// The directory rejected a value (malformed address, name too long...).
    #[error("value rejected by the directory: {message}")]
    ValidationRejected { message: String },

    /// Payload could not be serialized for the remote call.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    // Internal errors
    /// Internal error.
    #[error("internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl DirectoryError {
    /// Check if this error is transient.
    ///
    /// Transient errors are caused by temporary conditions (network issues,
    /// throttling) that may resolve on a later run. The engine does not
    /// retry within a run; classification feeds logging and exit codes.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DirectoryError::ConnectionFailed { .. }
                | DirectoryError::Timeout { .. }
                | DirectoryError::Unavailable { .. }
                | DirectoryError::Throttled { .. }
        )
    }

    /// Check if this error is permanent and a retry would not help.
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Check if this error reports a missing entry or group.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DirectoryError::EntryNotFound { .. } | DirectoryError::GroupNotFound { .. }
        )
    }

    /// Check if this error reports a conflicting object or a rejected value.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DirectoryError::AlreadyExists { .. } | DirectoryError::ValidationRejected { .. }
        )
    }

    /// Get an error code for classification.
    pub fn error_code(&self) -> &'static str {
        match self {
            DirectoryError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            DirectoryError::Timeout { .. } => "TIMEOUT",
            DirectoryError::Unavailable { .. } => "UNAVAILABLE",
            DirectoryError::Throttled { .. } => "THROTTLED",
            DirectoryError::SessionExpired => "SESSION_EXPIRED",
            DirectoryError::PermissionDenied { .. } => "PERMISSION_DENIED",
            DirectoryError::EntryNotFound { .. } => "ENTRY_NOT_FOUND",
            DirectoryError::GroupNotFound { .. } => "GROUP_NOT_FOUND",
            DirectoryError::AlreadyExists { .. } => "ALREADY_EXISTS",
            DirectoryError::ValidationRejected { .. } => "VALIDATION_REJECTED",
            DirectoryError::Serialization { .. } => "SERIALIZATION_ERROR",
            DirectoryError::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    // Convenience constructors

    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection failed error with source.
    pub fn connection_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::ConnectionFailed {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        DirectoryError::Unavailable {
            message: message.into(),
        }
    }

    /// Create an entry not found error.
    pub fn entry_not_found(identifier: impl Into<String>) -> Self {
        DirectoryError::EntryNotFound {
            identifier: identifier.into(),
        }
    }

    /// Create a group not found error.
    pub fn group_not_found(name: impl Into<String>) -> Self {
        DirectoryError::GroupNotFound { name: name.into() }
    }

    /// Create an already exists error.
    pub fn already_exists(identifier: impl Into<String>) -> Self {
        DirectoryError::AlreadyExists {
            identifier: identifier.into(),
        }
    }

    /// Create a validation rejected error.
    pub fn validation_rejected(message: impl Into<String>) -> Self {
        DirectoryError::ValidationRejected {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        DirectoryError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error with source.
    pub fn internal_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        DirectoryError::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<serde_json::Error> for DirectoryError {
    fn from(err: serde_json::Error) -> Self {
        DirectoryError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;
