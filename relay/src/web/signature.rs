//! Foxy webhook signature verification.
//!
//! Foxy signs webhook requests using HMAC-SHA256 over the raw request body,
//! keyed by the webhook's encryption key, and sends the hex digest in the
//! `Foxy-Webhook-Signature` header.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

use crate::error::AuthError;
use crate::ingress::RawRequest;

type HmacSha256 = Hmac<Sha256>;

/// Verify a Foxy webhook signature.
///
/// # Arguments
///
/// * `secret` - The shared webhook secret
/// * `body` - The exact bytes received, before any parsing
/// * `signature` - Hex-encoded HMAC-SHA256 claimed by the sender
///
/// # Returns
///
/// `true` if the signature matches, `false` otherwise.
pub fn verify_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    if secret.is_empty() || signature.is_empty() {
        warn!(
            has_secret = !secret.is_empty(),
            has_signature = !signature.is_empty(),
            "signature_missing_fields"
        );
        return false;
    }

    let claimed = match hex::decode(signature.trim()) {
        Ok(bytes) => bytes,
        Err(_) => {
            warn!(signature_length = signature.len(), "signature_not_hex");
            return false;
        }
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("signature_invalid_key");
            return false;
        }
    };

    mac.update(body);

    // verify_slice compares in constant time
    let valid = mac.verify_slice(&claimed).is_ok();

    if !valid {
        warn!(
            body_length = body.len(),
            signature_length = signature.len(),
            "signature_mismatch"
        );
    }

    valid
}

/// Compute the hex HMAC-SHA256 of `body`, as a sender would.
pub fn sign(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Check if signature verification is enabled.
pub fn is_signature_verification_enabled(secret: &Option<String>) -> bool {
    secret
        .as_ref()
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false)
}

/// Signature policy for one deployment.
///
/// Built from configuration; when no secret is configured no verifier exists
/// and requests are never checked.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    header: String,
}

impl SignatureVerifier {
    pub fn new(secret: String, header: String) -> Self {
        Self { secret, header }
    }

    /// Build a verifier only when a non-blank secret is configured.
    pub fn from_config(secret: &Option<String>, header: &str) -> Option<Self> {
        if !is_signature_verification_enabled(secret) {
            return None;
        }
        secret
            .as_ref()
            .map(|s| Self::new(s.clone(), header.to_string()))
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    /// Verify the request's signature header against its raw body.
    pub fn check(&self, request: &RawRequest) -> Result<(), AuthError> {
        let claimed = request
            .header(&self.header)
            .ok_or_else(|| AuthError::MissingSignature(self.header.clone()))?;

        if verify_signature(&self.secret, &request.body, claimed) {
            Ok(())
        } else {
            Err(AuthError::InvalidSignature)
        }
    }
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<REDACTED>")
            .field("header", &self.header)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, HeaderValue, Method};

    const SECRET: &str = "test-webhook-secret";
    const BODY: &[u8] = br#"{"id":"tx1","total_order":"20"}"#;

    fn signed_request(body: &[u8], signature: Option<&str>) -> RawRequest {
        let mut headers = HeaderMap::new();
        if let Some(sig) = signature {
            headers.insert("foxy-webhook-signature", HeaderValue::from_str(sig).unwrap());
        }
        RawRequest::new(Method::POST, headers, body.to_vec())
    }

    #[test]
    fn test_verify_signature_valid() {
        let signature = sign(SECRET, BODY).unwrap();
        assert!(verify_signature(SECRET, BODY, &signature));
    }

    #[test]
    fn test_verify_signature_uppercase_hex() {
        let signature = sign(SECRET, BODY).unwrap().to_uppercase();
        assert!(verify_signature(SECRET, BODY, &signature));
    }

    #[test]
    fn test_verify_signature_flipped_byte() {
        let signature = sign(SECRET, BODY).unwrap();

        for i in 0..BODY.len() {
            let mut tampered = BODY.to_vec();
            tampered[i] ^= 0x01;
            assert!(
                !verify_signature(SECRET, &tampered, &signature),
                "byte {} flip was accepted",
                i
            );
        }
    }

    #[test]
    fn test_verify_signature_wrong_secret() {
        let signature = sign("other-secret", BODY).unwrap();
        assert!(!verify_signature(SECRET, BODY, &signature));
    }

    #[test]
    fn test_verify_signature_missing_fields() {
        assert!(!verify_signature("", BODY, "abcd"));
        assert!(!verify_signature(SECRET, BODY, ""));
    }

    #[test]
    fn test_verify_signature_not_hex() {
        assert!(!verify_signature(SECRET, BODY, "not-a-hex-digest"));
    }

    #[test]
    fn test_verify_signature_truncated() {
        let signature = sign(SECRET, BODY).unwrap();
        assert!(!verify_signature(SECRET, BODY, &signature[..32]));
    }

    #[test]
    fn test_is_signature_verification_enabled() {
        assert!(!is_signature_verification_enabled(&None));
        assert!(!is_signature_verification_enabled(&Some("".to_string())));
        assert!(!is_signature_verification_enabled(&Some("   ".to_string())));
        assert!(is_signature_verification_enabled(&Some("key123".to_string())));
    }

    #[test]
    fn test_verifier_from_config() {
        assert!(SignatureVerifier::from_config(&None, "Foxy-Webhook-Signature").is_none());
        let verifier =
            SignatureVerifier::from_config(&Some(SECRET.to_string()), "Foxy-Webhook-Signature")
                .unwrap();
        assert_eq!(verifier.header(), "Foxy-Webhook-Signature");
    }

    #[test]
    fn test_verifier_keys_with_secret_as_configured() {
        let configured = "  padded-secret \n";
        let verifier =
            SignatureVerifier::from_config(&Some(configured.to_string()), "Foxy-Webhook-Signature")
                .unwrap();

        let exact = sign(configured, BODY).unwrap();
        assert!(verifier.check(&signed_request(BODY, Some(&exact))).is_ok());

        let trimmed = sign(configured.trim(), BODY).unwrap();
        assert!(matches!(
            verifier.check(&signed_request(BODY, Some(&trimmed))),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_verifier_check() {
        let verifier =
            SignatureVerifier::new(SECRET.to_string(), "Foxy-Webhook-Signature".to_string());

        let signature = sign(SECRET, BODY).unwrap();
        assert!(verifier.check(&signed_request(BODY, Some(&signature))).is_ok());

        assert!(matches!(
            verifier.check(&signed_request(BODY, None)),
            Err(AuthError::MissingSignature(_))
        ));

        assert!(matches!(
            verifier.check(&signed_request(b"{}", Some(&signature))),
            Err(AuthError::InvalidSignature)
        ));
    }

    #[test]
    fn test_verifier_debug_redacts_secret() {
        let verifier =
            SignatureVerifier::new(SECRET.to_string(), "Foxy-Webhook-Signature".to_string());
        let debug = format!("{:?}", verifier);
        assert!(!debug.contains(SECRET));
        assert!(debug.contains("REDACTED"));
    }
}
