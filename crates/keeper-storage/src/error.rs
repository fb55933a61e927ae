//! Object store errors.

use thiserror::Error;

/// Failure of an object store operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The object does not exist (or the store reported 404).
    #[error("object not found: {0}")]
    NotFound(String),

    /// The object name violates the store's naming rules.
    #[error("invalid object name: {0}")]
    InvalidObjectName(String),

    /// The store could not produce a signed URL.
    #[error("failed to sign upload URL for '{object}': {reason}")]
    Signing { object: String, reason: String },

    /// The client could not be constructed (credentials, config).
    #[error("storage client initialization failed: {0}")]
    Init(String),

    /// Any other backend failure, including mid-stream read errors.
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    /// Whether this error means "nothing to serve" rather than a fault.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::InvalidObjectName(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        assert!(StorageError::NotFound("a".into()).is_not_found());
        assert!(StorageError::InvalidObjectName("".into()).is_not_found());
        assert!(!StorageError::Backend("boom".into()).is_not_found());
    }

    #[test]
    fn signing_error_names_the_object() {
        let err = StorageError::Signing {
            object: "avatars/a/b.png".into(),
            reason: "no signer".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("avatars/a/b.png"));
        assert!(msg.contains("no signer"));
    }
}
