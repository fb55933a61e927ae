//! Shared test utilities for authentication testing.
//!
//! Checked-in RSA and EC key fixtures plus helpers for minting tokens,
//! including deliberately hostile ones (untrusted key, shared-secret
//! algorithm). Feature-gated behind `testutil` so it never reaches
//! production builds.
//!
//! ```toml
//! [dev-dependencies]
//! keeper-auth = { workspace = true, features = ["testutil"] }
//! ```
//!
//! All helpers panic on failure; they are for tests only.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::json;

use crate::verifier::Identity;

/// Public half of the key pair the service trusts.
pub const TRUSTED_PUBLIC_PEM: &str = include_str!("../fixtures/trusted_public.pem");

/// Private half of the trusted key pair (PKCS#1).
pub const TRUSTED_PRIVATE_PEM: &str = include_str!("../fixtures/trusted_private.pem");

/// A second RSA key the service does not trust.
pub const UNTRUSTED_PRIVATE_PEM: &str = include_str!("../fixtures/untrusted_private.pem");

/// A P-256 public key: valid PEM, wrong key family.
pub const EC_PUBLIC_PEM: &str = include_str!("../fixtures/ec_public.pem");

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before Unix epoch")
        .as_secs()
}

/// Sign arbitrary claims with an RSA private key.
///
/// # Panics
///
/// Panics if the key does not parse or encoding fails.
pub fn sign_claims(private_pem: &str, alg: Algorithm, claims: &serde_json::Value) -> String {
    let key = EncodingKey::from_rsa_pem(private_pem.as_bytes()).expect("fixture RSA key");
    encode(&Header::new(alg), claims, &key).expect("token encodes")
}

/// RS256 token for `subject`, signed by the trusted key, valid for one hour.
pub fn token_for(subject: &str) -> String {
    sign_claims(
        TRUSTED_PRIVATE_PEM,
        Algorithm::RS256,
        &json!({ "sub": subject, "iat": unix_now(), "exp": unix_now() + 3600 }),
    )
}

/// Same as [`token_for`] but signed by the untrusted key.
pub fn untrusted_token_for(subject: &str) -> String {
    sign_claims(
        UNTRUSTED_PRIVATE_PEM,
        Algorithm::RS256,
        &json!({ "sub": subject, "iat": unix_now(), "exp": unix_now() + 3600 }),
    )
}

/// HS256 token for `subject` keyed with `secret`.
pub fn hs256_token(subject: &str, secret: &[u8]) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        &json!({ "sub": subject, "exp": unix_now() + 3600 }),
        &EncodingKey::from_secret(secret),
    )
    .expect("token encodes")
}

/// Construct an [`Identity`] without a token, for handler-level tests.
pub fn identity(subject: &str) -> Identity {
    Identity::new(subject.to_string())
}
