//! Reference tokens for outbound links.
//!
//! A [`SecureToken`] is the first 16 hex characters of
//! `HMAC-SHA256(secret, entity_id ++ amount)`. It anchors a link to one job
//! and one amount: changing either invalidates the token. Tokens are minted on
//! demand and never stored apart from the record they authenticate.

use std::fmt;

use relay_core::Secret;
use url::Url;

use crate::signature::{fixed_len_ct_eq, hmac_sha256};

/// Token length in hex characters.
pub const TOKEN_HEX_LEN: usize = 16;

/// Token errors. A wrong token is not an error; it validates as `false`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// No secret configured.
    #[error("token secret is empty")]
    EmptySecret,

    /// Provided token contains non-hex characters.
    #[error("token is not hexadecimal")]
    MalformedToken,

    /// Link base URL could not be used.
    #[error("invalid link base URL: {0}")]
    InvalidBaseUrl(String),
}

/// A truncated keyed fingerprint of `(entity_id, amount)`.
#[derive(Clone, PartialEq, Eq)]
pub struct SecureToken(String);

impl SecureToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecureToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for SecureToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SecureToken").field(&self.0).finish()
    }
}

fn fingerprint(entity_id: &str, amount: &str, secret: &Secret) -> Result<[u8; TOKEN_HEX_LEN], TokenError> {
    if secret.is_empty() {
        return Err(TokenError::EmptySecret);
    }
    let mut message = Vec::with_capacity(entity_id.len() + amount.len());
    message.extend_from_slice(entity_id.as_bytes());
    message.extend_from_slice(amount.as_bytes());

    let digest = hex::encode(hmac_sha256(secret.as_bytes(), &message));
    let mut truncated = [0u8; TOKEN_HEX_LEN];
    truncated.copy_from_slice(&digest.as_bytes()[..TOKEN_HEX_LEN]);
    Ok(truncated)
}

/// Generate the token for `(entity_id, amount)`.
///
/// # Errors
///
/// Returns [`TokenError::EmptySecret`] when the secret is blank.
pub fn generate(entity_id: &str, amount: &str, secret: &Secret) -> Result<SecureToken, TokenError> {
    let bytes = fingerprint(entity_id, amount, secret)?;
    // Lowercase hex is always valid UTF-8
    Ok(SecureToken(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Check a provided token against `(entity_id, amount)`.
///
/// Comparison is over the hex text in constant time; uppercase or otherwise
/// re-encoded tokens do not validate.
///
/// # Errors
///
/// Returns [`TokenError::MalformedToken`] for non-hex input and
/// [`TokenError::EmptySecret`] when the secret is blank.
pub fn validate(
    entity_id: &str,
    amount: &str,
    provided: &str,
    secret: &Secret,
) -> Result<bool, TokenError> {
    if !provided.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(TokenError::MalformedToken);
    }
    let expected = fingerprint(entity_id, amount, secret)?;
    Ok(fixed_len_ct_eq(&expected, provided.as_bytes()))
}

/// Build an outbound payment link carrying `job`, `amount` and `token`.
///
/// # Errors
///
/// Fails when the secret is blank or the base URL cannot carry a query.
pub fn payment_link(
    base_url: &str,
    entity_id: &str,
    amount: &str,
    secret: &Secret,
) -> Result<Url, TokenError> {
    let mut url = Url::parse(base_url).map_err(|e| TokenError::InvalidBaseUrl(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(TokenError::InvalidBaseUrl(base_url.to_string()));
    }
    let token = generate(entity_id, amount, secret)?;
    url.query_pairs_mut()
        .append_pair("job", entity_id)
        .append_pair("amount", amount)
        .append_pair("token", token.as_str());
    Ok(url)
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use proptest::prelude::*;

    use super::*;

    fn secret() -> Secret {
        Secret::new("token-secret")
    }

    #[test]
    fn test_generate_is_deterministic_and_sized() {
        let a = generate("HH-900", "250.00", &secret()).unwrap();
        let b = generate("HH-900", "250.00", &secret()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), TOKEN_HEX_LEN);
        assert!(a.as_str().bytes().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_token_is_hmac_prefix() {
        let token = generate("HH-900", "250.00", &secret()).unwrap();
        let full = hex::encode(hmac_sha256(b"token-secret", b"HH-900250.00"));
        assert_eq!(token.as_str(), &full[..TOKEN_HEX_LEN]);
    }

    #[test]
    fn test_token_anchored_to_job_and_amount() {
        let token = generate("HH-900", "250.00", &secret()).unwrap();
        assert!(!validate("HH-901", "250.00", token.as_str(), &secret()).unwrap());
        assert!(!validate("HH-900", "250.01", token.as_str(), &secret()).unwrap());
        assert!(!validate("HH-900", "250.00", token.as_str(), &Secret::new("other")).unwrap());
    }

    #[test]
    fn test_empty_secret_is_configuration_error() {
        assert_eq!(
            generate("HH-900", "250.00", &Secret::new("")),
            Err(TokenError::EmptySecret)
        );
        assert_eq!(
            validate("HH-900", "250.00", "0123456789abcdef", &Secret::new("")),
            Err(TokenError::EmptySecret)
        );
    }

    #[test]
    fn test_length_mismatch_is_false_not_error() {
        let token = generate("HH-900", "250.00", &secret()).unwrap();
        let short = &token.as_str()[..8];
        let long = format!("{token}00");
        assert!(!validate("HH-900", "250.00", short, &secret()).unwrap());
        assert!(!validate("HH-900", "250.00", &long, &secret()).unwrap());
        assert!(!validate("HH-900", "250.00", "", &secret()).unwrap());
    }

    #[test]
    fn test_non_hex_is_malformed() {
        assert_eq!(
            validate("HH-900", "250.00", "zzzzzzzzzzzzzzzz", &secret()),
            Err(TokenError::MalformedToken)
        );
        assert_eq!(
            validate("HH-900", "250.00", "0123456789abcde ", &secret()),
            Err(TokenError::MalformedToken)
        );
    }

    #[test]
    fn test_uppercase_token_does_not_validate() {
        let token = generate("HH-900", "250.00", &secret()).unwrap();
        let upper = token.as_str().to_ascii_uppercase();
        if upper != token.as_str() {
            assert!(!validate("HH-900", "250.00", &upper, &secret()).unwrap());
        }
    }

    #[test]
    fn test_payment_link_round_trips() {
        let url = payment_link("https://pay.example.com/checkout", "HH-900", "250.00", &secret())
            .unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("job".into(), "HH-900".into()));
        assert_eq!(pairs[1], ("amount".into(), "250.00".into()));
        assert!(validate("HH-900", "250.00", &pairs[2].1, &secret()).unwrap());
    }

    #[test]
    fn test_payment_link_rejects_bad_base() {
        assert!(matches!(
            payment_link("not a url", "HH-900", "250.00", &secret()),
            Err(TokenError::InvalidBaseUrl(_))
        ));
        assert!(matches!(
            payment_link("mailto:billing@example.com", "HH-900", "250.00", &secret()),
            Err(TokenError::InvalidBaseUrl(_))
        ));
    }

    /// Median time of `rounds` validations of `candidate`.
    fn median_nanos(candidate: &str, rounds: usize) -> u128 {
        let secret = secret();
        let mut samples: Vec<u128> = (0..rounds)
            .map(|_| {
                let start = Instant::now();
                let ok = validate("HH-900", "250.00", candidate, &secret).unwrap();
                let elapsed = start.elapsed().as_nanos();
                assert!(!ok);
                elapsed
            })
            .collect();
        samples.sort_unstable();
        samples[samples.len() / 2]
    }

    #[test]
    fn test_timing_independent_of_mismatch_position() {
        let token = generate("HH-900", "250.00", &secret()).unwrap();
        let flip = |idx: usize| {
            let mut bytes = token.as_str().as_bytes().to_vec();
            bytes[idx] = if bytes[idx] == b'0' { b'1' } else { b'0' };
            String::from_utf8(bytes).unwrap()
        };
        let first = flip(0);
        let last = flip(TOKEN_HEX_LEN - 1);

        // Warm up caches and the allocator before sampling
        median_nanos(&first, 200);
        median_nanos(&last, 200);

        let early = median_nanos(&first, 2_000).max(1);
        let late = median_nanos(&last, 2_000).max(1);
        let ratio = early as f64 / late as f64;
        assert!(
            (0.5..2.0).contains(&ratio),
            "mismatch position changed timing: first={early}ns last={late}ns"
        );
    }

    proptest! {
        #[test]
        fn prop_generated_token_validates(
            id in "[A-Z]{2}-[0-9]{1,6}",
            amount in "[0-9]{1,6}\\.[0-9]{2}",
            key in "[ -~]{1,48}",
        ) {
            let secret = Secret::new(key);
            prop_assume!(!secret.is_empty());
            let token = generate(&id, &amount, &secret).unwrap();
            prop_assert!(validate(&id, &amount, token.as_str(), &secret).unwrap());
        }

        #[test]
        fn prop_single_char_mutation_fails(
            id in "[A-Z]{2}-[0-9]{1,6}",
            amount in "[0-9]{1,6}\\.[0-9]{2}",
            idx in 0usize..TOKEN_HEX_LEN,
            replacement in prop::sample::select(b"0123456789abcdefABCDEF".to_vec()),
        ) {
            let secret = secret();
            let token = generate(&id, &amount, &secret).unwrap();
            let mut bytes = token.as_str().as_bytes().to_vec();
            prop_assume!(bytes[idx] != replacement);
            bytes[idx] = replacement;
            let mutated = String::from_utf8(bytes).unwrap();
            prop_assert!(!validate(&id, &amount, &mutated, &secret).unwrap());
        }
    }
}
