//! Webhook signature verification.
//!
//! All comparisons go through [`fixed_len_ct_eq`]: the provided value is copied
//! into a buffer of the expected length and the length check is folded into the
//! same constant-time result, so neither content nor length mismatches take an
//! early exit.

use hmac::{Hmac, Mac};
use relay_core::Secret;
use sha2::Sha256;
use subtle::{Choice, ConstantTimeEq};

use crate::{WebhookError, WebhookResult};

/// HMAC-SHA256 output length in bytes.
pub const HMAC_SHA256_LEN: usize = 32;

/// Trait for signature verification.
pub trait SignatureVerifier: Send + Sync {
    /// Verify a signature against the raw payload.
    fn verify(&self, payload: &[u8], signature: &str) -> WebhookResult<()>;
}

/// HMAC-SHA256 signature verifier.
#[derive(Clone)]
pub struct HmacSha256Verifier {
    secret: Secret,
}

impl HmacSha256Verifier {
    /// Create a new HMAC-SHA256 verifier.
    #[must_use]
    pub const fn new(secret: Secret) -> Self {
        Self { secret }
    }

    /// Compute the raw MAC for a payload.
    #[must_use]
    pub fn compute_bytes(&self, payload: &[u8]) -> [u8; HMAC_SHA256_LEN] {
        hmac_sha256(self.secret.as_bytes(), payload)
    }

    /// Compute the hex signature for a payload.
    #[must_use]
    pub fn compute(&self, payload: &[u8]) -> String {
        hex::encode(self.compute_bytes(payload))
    }

    /// Check one hex candidate without returning early.
    pub(crate) fn matches(&self, payload: &[u8], sig_hex: &str) -> Choice {
        let expected = self.compute_bytes(payload);
        // Non-hex or odd-length candidates compare as an empty slice
        let provided = hex::decode(sig_hex).unwrap_or_default();
        fixed_len_ct_choice(&expected, &provided)
    }
}

impl SignatureVerifier for HmacSha256Verifier {
    fn verify(&self, payload: &[u8], signature: &str) -> WebhookResult<()> {
        // Handle different signature formats
        let sig_hex = signature
            .trim()
            .strip_prefix("sha256=")
            .or_else(|| signature.trim().strip_prefix("v1="))
            .unwrap_or_else(|| signature.trim());

        if bool::from(self.matches(payload, sig_hex)) {
            Ok(())
        } else {
            Err(WebhookError::InvalidSignature)
        }
    }
}

impl std::fmt::Debug for HmacSha256Verifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacSha256Verifier")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// HMAC-SHA256 of `message` under `key`.
pub(crate) fn hmac_sha256(key: &[u8], message: &[u8]) -> [u8; HMAC_SHA256_LEN] {
    let mut mac =
        <Hmac<Sha256> as Mac>::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(message);
    let mut out = [0u8; HMAC_SHA256_LEN];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

fn fixed_len_ct_choice<const N: usize>(expected: &[u8; N], provided: &[u8]) -> Choice {
    let mut candidate = [0u8; N];
    let copied = provided.len().min(N);
    candidate[..copied].copy_from_slice(&provided[..copied]);

    let same_len = (provided.len() as u64).ct_eq(&(N as u64));
    expected[..].ct_eq(&candidate[..]) & same_len
}

/// Constant-time comparison against a fixed-length expected value.
#[must_use]
pub fn fixed_len_ct_eq<const N: usize>(expected: &[u8; N], provided: &[u8]) -> bool {
    fixed_len_ct_choice(expected, provided).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> HmacSha256Verifier {
        HmacSha256Verifier::new(Secret::new("secret"))
    }

    #[test]
    fn test_hmac_sha256_verify() {
        let verifier = verifier();
        let payload = b"test payload";
        let signature = verifier.compute(payload);

        assert!(verifier.verify(payload, &signature).is_ok());
        assert!(verifier.verify(payload, "invalid").is_err());
    }

    #[test]
    fn test_hmac_sha256_with_prefix() {
        let verifier = verifier();
        let payload = b"test payload";

        let signature = format!("sha256={}", verifier.compute(payload));
        assert!(verifier.verify(payload, &signature).is_ok());

        let signature = format!("v1={}", verifier.compute(payload));
        assert!(verifier.verify(payload, &signature).is_ok());
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2
        let verifier = HmacSha256Verifier::new(Secret::new("Jefe"));
        assert_eq!(
            verifier.compute(b"what do ya want for nothing?"),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_body_tampering_detected() {
        let verifier = verifier();
        let signature = verifier.compute(br#"{"amount":100}"#);
        assert!(matches!(
            verifier.verify(br#"{"amount":900}"#, &signature),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn test_truncated_signature_rejected() {
        let verifier = verifier();
        let payload = b"test payload";
        let signature = verifier.compute(payload);
        assert!(verifier.verify(payload, &signature[..62]).is_err());
        assert!(verifier.verify(payload, &format!("{signature}00")).is_err());
    }

    #[test]
    fn test_fixed_len_ct_eq() {
        assert!(fixed_len_ct_eq(b"hello", b"hello"));
        assert!(!fixed_len_ct_eq(b"hello", b"world"));
        assert!(!fixed_len_ct_eq(b"hello", b"helloworld"));
        assert!(!fixed_len_ct_eq(b"hello", b"hell"));
        assert!(!fixed_len_ct_eq(b"hell\0", b"hell"));
        assert!(!fixed_len_ct_eq(b"hello", b""));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let verifier = HmacSha256Verifier::new(Secret::new("topsecretvalue"));
        let rendered = format!("{verifier:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("topsecretvalue"));
    }
}
