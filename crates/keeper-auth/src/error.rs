//! # Authentication Error Taxonomy
//!
//! Every way the authentication gate can fail, grouped into three classes:
//!
//! | Class           | Variants                                           | Caller sees              |
//! |-----------------|----------------------------------------------------|--------------------------|
//! | Request shape   | `MissingHeader`, `MalformedHeader`                 | specific 401 message     |
//! | Credential      | `Signature`, `TokenInvalid`, `ClaimMissing`        | generic `Invalid token`  |
//! | Configuration   | `KeyFormat`                                        | generic 500              |
//!
//! The `Display` output carries the detailed cause and is meant for server
//! logs only. What a caller is allowed to see comes from
//! [`AuthError::public_message`], which collapses every credential failure
//! into one message so responses cannot be used as an oracle.
//!
//! No variant is retryable: the same input always fails the same way.

use thiserror::Error;

/// Message returned for a request without an `Authorization` header.
pub const MISSING_HEADER_MESSAGE: &str = "Authorization header required";

/// Message returned when the header is not `Bearer <non-empty token>`.
pub const MALFORMED_HEADER_MESSAGE: &str = "Invalid token format. Expected Bearer token.";

/// Message returned for every credential-class failure.
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid token";

/// Message returned when the verifier itself is misconfigured.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Authentication failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The configured public key is not a PEM-encoded RSA public key.
    #[error("invalid verification key: {0}")]
    KeyFormat(String),

    /// Signature mismatch, or the token declares a non-RSA algorithm.
    #[error("signature verification failed: {0}")]
    Signature(String),

    /// Structurally broken, expired, or not-yet-valid token.
    #[error("token failed validation: {0}")]
    TokenInvalid(String),

    /// The `sub` claim is absent, empty, or not a string.
    #[error("subject (sub) claim is missing or not a non-empty string")]
    ClaimMissing,

    /// No `Authorization` header on the request.
    #[error("authorization header missing")]
    MissingHeader,

    /// The `Authorization` header is not `Bearer <token>`.
    #[error("malformed authorization header: {0}")]
    MalformedHeader(&'static str),
}

/// Coarse classification of an [`AuthError`], used to choose the HTTP
/// status and how much detail the caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// The request did not carry a credential in the expected shape.
    RequestShape,
    /// A credential was presented but could not be trusted.
    Credential,
    /// Server-side misconfiguration; never the caller's fault.
    Configuration,
}

impl AuthError {
    /// Classify this error.
    pub fn class(&self) -> FailureClass {
        match self {
            Self::MissingHeader | Self::MalformedHeader(_) => FailureClass::RequestShape,
            Self::Signature(_) | Self::TokenInvalid(_) | Self::ClaimMissing => {
                FailureClass::Credential
            }
            Self::KeyFormat(_) => FailureClass::Configuration,
        }
    }

    /// The message a caller is allowed to see.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::MissingHeader => MISSING_HEADER_MESSAGE,
            Self::MalformedHeader(_) => MALFORMED_HEADER_MESSAGE,
            Self::Signature(_) | Self::TokenInvalid(_) | Self::ClaimMissing => {
                INVALID_TOKEN_MESSAGE
            }
            Self::KeyFormat(_) => INTERNAL_MESSAGE,
        }
    }

    /// Stable, low-cardinality label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::KeyFormat(_) => "key_format",
            Self::Signature(_) => "signature",
            Self::TokenInvalid(_) => "token_invalid",
            Self::ClaimMissing => "claim_missing",
            Self::MissingHeader => "missing_header",
            Self::MalformedHeader(_) => "malformed_header",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for AuthError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm
            | ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::Crypto(_) => Self::Signature(err.to_string()),
            ErrorKind::InvalidKeyFormat => Self::KeyFormat(err.to_string()),
            _ => Self::TokenInvalid(err.to_string()),
        }
    }
}
