//! # keeper-auth — Bearer Token Verification
//!
//! The authentication core of the Keeper media service:
//!
//! - [`verifier`]: RSA-signed JWT validation against a process-wide public
//!   key, yielding the caller's [`Identity`].
//! - [`bearer`]: `Authorization: Bearer <token>` header parsing.
//! - [`error`]: the [`AuthError`] taxonomy shared by both.
//!
//! ## Security Invariants
//!
//! - Only RSA-family algorithms (RS256/384/512, PS256/384/512) are accepted.
//!   A token declaring a shared-secret algorithm is rejected before any
//!   signature check, even when its structure is otherwise valid.
//! - An [`Identity`] can only be constructed by a successful verification
//!   (or explicitly in tests); there is no public constructor.
//! - Verification is a pure function of `(token, key)`: no caches, no
//!   mutable state, safe to call from any number of tasks concurrently.

pub mod bearer;
pub mod error;
pub mod verifier;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;

pub use bearer::parse_bearer;
pub use error::{AuthError, FailureClass};
pub use verifier::{validate, Identity, TokenVerifier};
