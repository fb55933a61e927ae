//! # Token Verifier
//!
//! Validates a bearer credential against the process-wide RSA public key and
//! extracts the caller's identity from the `sub` claim.
//!
//! ## Steps
//!
//! 1. Decode the PEM block and parse an RSA public key, modulus and
//!    exponent included ([`AuthError::KeyFormat`]).
//! 2. Reject tokens whose header declares anything but an RSA-family
//!    algorithm ([`AuthError::Signature`]). This runs before the signature
//!    check so a shared-secret token keyed with the public PEM bytes can
//!    never be accepted.
//! 3. Verify the signature ([`AuthError::Signature`]).
//! 4. Check `exp` and `nbf` when present, with zero leeway
//!    ([`AuthError::TokenInvalid`]).
//! 5. Require `sub` to be a non-empty string ([`AuthError::ClaimMissing`]).
//!
//! [`TokenVerifier`] performs step 1 once at construction; [`validate`]
//! performs all five per call.

use std::fmt;

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::RsaPublicKey;
use serde::Deserialize;

use crate::error::AuthError;

/// Algorithms a credential may declare. All share the RSA key family.
pub const ACCEPTED_ALGORITHMS: [Algorithm; 6] = [
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

/// PEM labels that may carry an RSA public key (SPKI and PKCS#1).
const PUBLIC_KEY_LABELS: [&str; 2] = ["PUBLIC KEY", "RSA PUBLIC KEY"];

/// The verified subject of a credential.
///
/// Only produced by a successful [`TokenVerifier::verify`]; handlers can
/// therefore treat holding one as proof that verification ran.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity(String);

impl Identity {
    pub(crate) fn new(subject: String) -> Self {
        Self(subject)
    }

    /// The subject string, opaque to this crate.
    pub fn subject(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Only `sub` is read; everything else in the payload is ignored.
#[derive(Deserialize)]
struct SubjectClaims {
    #[serde(default)]
    sub: Option<serde_json::Value>,
}

/// Verifier bound to one immutable RSA public key.
///
/// Holds no mutable state. Share it behind an `Arc` and call
/// [`verify`](Self::verify) from any task.
#[derive(Clone)]
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// Parse a PEM-encoded RSA public key.
    ///
    /// # Errors
    ///
    /// [`AuthError::KeyFormat`] if there is no PEM block, the block is not a
    /// public key, or the key is not RSA.
    pub fn from_pem(public_key_pem: &str) -> Result<Self, AuthError> {
        let label = pem_label(public_key_pem).ok_or_else(|| {
            AuthError::KeyFormat("failed to parse PEM block containing the public key".into())
        })?;
        if !PUBLIC_KEY_LABELS.contains(&label) {
            return Err(AuthError::KeyFormat(format!(
                "PEM block is '{label}', expected a public key"
            )));
        }

        // jsonwebtoken keeps the DER without reading the modulus or exponent,
        // so the key is parsed in full here.
        let trimmed = public_key_pem.trim();
        let parsed = if label == "RSA PUBLIC KEY" {
            RsaPublicKey::from_pkcs1_pem(trimmed).map_err(|e| e.to_string())
        } else {
            RsaPublicKey::from_public_key_pem(trimmed).map_err(|e| e.to_string())
        };
        if let Err(e) = parsed {
            return Err(AuthError::KeyFormat(format!(
                "key is not an RSA public key: {e}"
            )));
        }

        let key = DecodingKey::from_rsa_pem(trimmed.as_bytes())
            .map_err(|e| AuthError::KeyFormat(format!("key is not an RSA public key: {e}")))?;

        Ok(Self {
            key,
            validation: rsa_validation(),
        })
    }

    /// Verify `token` (without the `Bearer ` prefix) and return its subject.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Signature`]: non-RSA algorithm or bad signature.
    /// - [`AuthError::TokenInvalid`]: malformed, expired, or not yet valid.
    /// - [`AuthError::ClaimMissing`]: no usable `sub` claim.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let header = decode_header(token)
            .map_err(|e| AuthError::TokenInvalid(format!("failed to parse token header: {e}")))?;

        if !ACCEPTED_ALGORITHMS.contains(&header.alg) {
            return Err(AuthError::Signature(format!(
                "unexpected signing method: {:?}",
                header.alg
            )));
        }

        let data = decode::<SubjectClaims>(token, &self.key, &self.validation)?;

        match data.claims.sub {
            Some(serde_json::Value::String(subject)) if !subject.is_empty() => {
                Ok(Identity::new(subject))
            }
            _ => Err(AuthError::ClaimMissing),
        }
    }
}

/// Validate `token` against `public_key_pem` in one call.
///
/// Parses the key on every call. Long-running callers should build a
/// [`TokenVerifier`] once instead.
pub fn validate(token: &str, public_key_pem: &str) -> Result<Identity, AuthError> {
    TokenVerifier::from_pem(public_key_pem)?.verify(token)
}

fn rsa_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::RS256);
    validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
    // exp/nbf are checked when present but not required.
    validation.required_spec_claims.clear();
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.validate_aud = false;
    validation.leeway = 0;
    validation
}

/// Label of the first `-----BEGIN <label>-----` line, if any.
fn pem_label(input: &str) -> Option<&str> {
    let start = input.find("-----BEGIN ")? + "-----BEGIN ".len();
    let rest = &input[start..];
    let end = rest.find("-----")?;
    let label = &rest[..end];
    if label.is_empty() || label.contains('\n') {
        return None;
    }
    Some(label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{
        hs256_token, sign_claims, token_for, unix_now, untrusted_token_for, EC_PUBLIC_PEM,
        TRUSTED_PRIVATE_PEM, TRUSTED_PUBLIC_PEM,
    };
    use proptest::prelude::*;
    use serde_json::json;

    fn verifier() -> TokenVerifier {
        TokenVerifier::from_pem(TRUSTED_PUBLIC_PEM).expect("fixture key parses")
    }

    // ── Key parsing ──────────────────────────────────────────────

    #[test]
    fn trusted_fixture_parses() {
        assert!(TokenVerifier::from_pem(TRUSTED_PUBLIC_PEM).is_ok());
    }

    #[test]
    fn empty_key_is_key_format() {
        assert!(matches!(
            TokenVerifier::from_pem(""),
            Err(AuthError::KeyFormat(_))
        ));
    }

    #[test]
    fn ec_key_is_key_format() {
        assert!(matches!(
            TokenVerifier::from_pem(EC_PUBLIC_PEM),
            Err(AuthError::KeyFormat(_))
        ));
    }

    #[test]
    fn private_key_is_key_format() {
        let err = TokenVerifier::from_pem(TRUSTED_PRIVATE_PEM).unwrap_err();
        assert!(matches!(err, AuthError::KeyFormat(ref m) if m.contains("PRIVATE KEY")));
    }

    #[test]
    fn corrupted_base64_body_is_key_format() {
        let broken = TRUSTED_PUBLIC_PEM.replacen("MII", "!!!", 1);
        assert!(matches!(
            TokenVerifier::from_pem(&broken),
            Err(AuthError::KeyFormat(_))
        ));
    }

    /// PKCS#1 armor around DER that is not an `RSAPublicKey` sequence.
    const PKCS1_NOT_A_KEY: &str = "-----BEGIN RSA PUBLIC KEY-----\nBQA=\n-----END RSA PUBLIC KEY-----\n";

    /// SPKI with the rsaEncryption OID and a one-byte BIT STRING payload.
    const SPKI_GARBAGE_RSA: &str =
        "-----BEGIN PUBLIC KEY-----\nMBMwDQYJKoZIhvcNAQEBBQADAgD/\n-----END PUBLIC KEY-----\n";

    /// PKCS#1 sequence with a modulus and no exponent.
    const PKCS1_MISSING_EXPONENT: &str =
        "-----BEGIN RSA PUBLIC KEY-----\nMAMCAQA=\n-----END RSA PUBLIC KEY-----\n";

    #[test]
    fn well_formed_der_that_is_not_a_key_is_key_format() {
        for pem in [PKCS1_NOT_A_KEY, SPKI_GARBAGE_RSA, PKCS1_MISSING_EXPONENT] {
            let result = TokenVerifier::from_pem(pem);
            assert!(matches!(result, Err(AuthError::KeyFormat(_))), "{pem}: got {result:?}");
        }
    }

    #[test]
    fn unparseable_rsa_key_never_reaches_signature_check() {
        let token = token_for("alice");
        for pem in [PKCS1_NOT_A_KEY, SPKI_GARBAGE_RSA] {
            let result = validate(&token, pem);
            assert!(matches!(result, Err(AuthError::KeyFormat(_))), "{pem}: got {result:?}");
        }
    }

    #[test]
    fn surrounding_whitespace_is_tolerated() {
        let padded = format!("\n  {TRUSTED_PUBLIC_PEM}\n\n");
        assert_eq!(
            validate(&token_for("alice"), &padded).unwrap().subject(),
            "alice"
        );
    }

    #[test]
    fn bad_key_fails_before_looking_at_token() {
        // A perfectly valid token still reports the key problem.
        let token = token_for("alice");
        assert!(matches!(
            validate(&token, "not a pem"),
            Err(AuthError::KeyFormat(_))
        ));
    }

    #[test]
    fn pem_label_extraction() {
        assert_eq!(pem_label(TRUSTED_PUBLIC_PEM), Some("PUBLIC KEY"));
        assert_eq!(pem_label("-----BEGIN -----"), None);
        assert_eq!(pem_label("no markers here"), None);
    }

    proptest! {
        #[test]
        fn arbitrary_text_is_never_a_key(input in ".{0,256}") {
            prop_assert!(matches!(
                TokenVerifier::from_pem(&input),
                Err(AuthError::KeyFormat(_))
            ));
        }

        #[test]
        fn arbitrary_body_inside_pem_armor_is_key_format(body in "[A-Za-z0-9+/]{0,120}") {
            let pem = format!("-----BEGIN PUBLIC KEY-----\n{body}\n-----END PUBLIC KEY-----\n");
            prop_assert!(matches!(
                TokenVerifier::from_pem(&pem),
                Err(AuthError::KeyFormat(_))
            ));
        }
    }

    // ── Verification ─────────────────────────────────────────────

    #[test]
    fn valid_token_yields_subject() {
        let identity = verifier().verify(&token_for("alice")).unwrap();
        assert_eq!(identity.subject(), "alice");
        assert_eq!(identity.to_string(), "alice");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn any_non_empty_subject_round_trips_exactly(subject in "[\\PC\t /]{1,40}") {
            let token = sign_claims(
                TRUSTED_PRIVATE_PEM,
                Algorithm::RS256,
                &json!({ "sub": subject, "exp": unix_now() + 600 }),
            );
            let identity = verifier().verify(&token).unwrap();
            prop_assert_eq!(identity.subject(), subject.as_str());
        }
    }

    #[test]
    fn verification_is_idempotent() {
        let v = verifier();
        let token = token_for("bob");
        let first = v.verify(&token).unwrap();
        let second = v.verify(&token).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn free_function_matches_verifier() {
        let token = token_for("carol");
        assert_eq!(
            validate(&token, TRUSTED_PUBLIC_PEM).unwrap(),
            verifier().verify(&token).unwrap()
        );
    }

    #[test]
    fn untrusted_key_is_signature_error() {
        let result = verifier().verify(&untrusted_token_for("mallory"));
        assert!(matches!(result, Err(AuthError::Signature(_))), "got {result:?}");
    }

    #[test]
    fn shared_secret_algorithm_is_rejected() {
        // Classic confusion attack: HMAC keyed with the public key bytes.
        let token = hs256_token("mallory", TRUSTED_PUBLIC_PEM.as_bytes());
        let result = verifier().verify(&token);
        assert!(matches!(result, Err(AuthError::Signature(_))), "got {result:?}");
    }

    #[test]
    fn every_rsa_algorithm_is_accepted() {
        let v = verifier();
        for alg in ACCEPTED_ALGORITHMS {
            let token = sign_claims(
                TRUSTED_PRIVATE_PEM,
                alg,
                &json!({ "sub": "dave", "exp": unix_now() + 600 }),
            );
            assert_eq!(v.verify(&token).unwrap().subject(), "dave", "{alg:?}");
        }
    }

    #[test]
    fn expired_token_is_token_invalid() {
        let token = sign_claims(
            TRUSTED_PRIVATE_PEM,
            Algorithm::RS256,
            &json!({ "sub": "alice", "exp": unix_now() - 3600 }),
        );
        assert!(matches!(
            verifier().verify(&token),
            Err(AuthError::TokenInvalid(_))
        ));
    }

    #[test]
    fn not_yet_valid_token_is_token_invalid() {
        let token = sign_claims(
            TRUSTED_PRIVATE_PEM,
            Algorithm::RS256,
            &json!({ "sub": "alice", "nbf": unix_now() + 3600 }),
        );
        assert!(matches!(
            verifier().verify(&token),
            Err(AuthError::TokenInvalid(_))
        ));
    }

    #[test]
    fn token_without_exp_is_accepted() {
        let token = sign_claims(TRUSTED_PRIVATE_PEM, Algorithm::RS256, &json!({ "sub": "erin" }));
        assert_eq!(verifier().verify(&token).unwrap().subject(), "erin");
    }

    #[test]
    fn audience_is_not_enforced() {
        let token = sign_claims(
            TRUSTED_PRIVATE_PEM,
            Algorithm::RS256,
            &json!({ "sub": "frank", "aud": "someone-else", "exp": unix_now() + 600 }),
        );
        assert_eq!(verifier().verify(&token).unwrap().subject(), "frank");
    }

    #[test]
    fn garbage_token_is_token_invalid() {
        assert!(matches!(
            verifier().verify("not-a-jwt"),
            Err(AuthError::TokenInvalid(_))
        ));
    }

    #[test]
    fn tampered_payload_is_signature_error() {
        let token = token_for("alice");
        let parts: Vec<&str> = token.split('.').collect();
        let forged_payload = sign_claims(
            TRUSTED_PRIVATE_PEM,
            Algorithm::RS256,
            &json!({ "sub": "admin", "exp": unix_now() + 600 }),
        );
        let forged_payload = forged_payload.split('.').nth(1).unwrap();
        let spliced = format!("{}.{}.{}", parts[0], forged_payload, parts[2]);
        assert!(matches!(
            verifier().verify(&spliced),
            Err(AuthError::Signature(_))
        ));
    }

    #[test]
    fn missing_subject_is_claim_missing() {
        let token = sign_claims(
            TRUSTED_PRIVATE_PEM,
            Algorithm::RS256,
            &json!({ "exp": unix_now() + 600 }),
        );
        assert_eq!(verifier().verify(&token), Err(AuthError::ClaimMissing));
    }

    #[test]
    fn empty_subject_is_claim_missing() {
        let token = sign_claims(
            TRUSTED_PRIVATE_PEM,
            Algorithm::RS256,
            &json!({ "sub": "", "exp": unix_now() + 600 }),
        );
        assert_eq!(verifier().verify(&token), Err(AuthError::ClaimMissing));
    }

    #[test]
    fn non_string_subject_is_claim_missing() {
        let token = sign_claims(
            TRUSTED_PRIVATE_PEM,
            Algorithm::RS256,
            &json!({ "sub": 42, "exp": unix_now() + 600 }),
        );
        assert_eq!(verifier().verify(&token), Err(AuthError::ClaimMissing));
    }

    #[test]
    fn verifier_shared_across_threads() {
        let v = std::sync::Arc::new(verifier());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let v = v.clone();
                std::thread::spawn(move || {
                    let subject = format!("user-{i}");
                    let identity = v.verify(&token_for(&subject)).unwrap();
                    assert_eq!(identity.subject(), subject);
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn debug_does_not_dump_key_material() {
        let rendered = format!("{:?}", verifier());
        assert!(rendered.contains("TokenVerifier"));
        assert!(!rendered.contains("MII"));
    }
}
