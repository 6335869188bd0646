//! Error types for storage operations

use thiserror::Error;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in the storage layer
///
/// A missing record is never an error: lookups return `Option` and
/// deletes return `bool`.
#[derive(Debug, Error)]
pub enum StorageError {
    /// SQLite engine failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// File I/O failure in the flat store or session file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored record could not be (de)serialized
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend could not be opened; triggers fallback during selection
    #[error("Storage backend unavailable: {0}")]
    BackendUnavailable(String),

    /// Input rejected before any mutation took place
    #[error("Validation error: {0}")]
    Validation(String),

    /// An operation needed the current user but nobody is logged in
    #[error("No user is logged in")]
    NoActiveSession,

    /// The flat store would grow past its configured quota
    #[error("Storage quota exceeded: {needed} bytes needed, {quota} bytes allowed")]
    QuotaExceeded { needed: u64, quota: u64 },

    /// A different account already uses this user id
    #[error("User id '{0}' is already taken by another account")]
    DuplicateUserId(String),

    /// Export requested for a user with no stored record
    #[error("Nothing to export for user '{0}'")]
    NothingToExport(String),

    /// Password hashing or verification failed
    #[error("Credential error: {0}")]
    Credential(String),

    /// Configuration file or override could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl StorageError {
    /// Get the error code for CLI/API responses
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Sqlite(_) | Self::Io(_) => "STORAGE_ERROR",
            Self::Json(_) => "PARSE_ERROR",
            Self::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::NoActiveSession => "NO_SESSION",
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::DuplicateUserId(_) => "CONFLICT",
            Self::NothingToExport(_) => "NOTHING_TO_EXPORT",
            Self::Credential(_) => "CREDENTIAL_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(StorageError::NoActiveSession.code(), "NO_SESSION");
        assert_eq!(
            StorageError::Validation("bad".to_string()).code(),
            "VALIDATION_ERROR"
        );
        let err = StorageError::DuplicateUserId("u1".to_string());
        assert_eq!(err.code(), "CONFLICT");
        assert_eq!(err.to_string(), "User id 'u1' is already taken by another account");
    }
}
