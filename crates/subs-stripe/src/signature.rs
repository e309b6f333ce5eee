//! # Webhook Signature Verification
//!
//! Stripe signs each delivery with `Stripe-Signature: t=<unix>,v1=<hex>`.
//! The `v1` value is `HMAC-SHA256(secret, "<t>." + body)`. Several `v1`
//! entries may be present while a secret is being rolled; any one matching
//! is enough.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subs_core::SignatureError;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Default timestamp tolerance (5 minutes)
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Parsed `Stripe-Signature` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    /// Decoded `v1` signatures
    pub signatures: Vec<Vec<u8>>,
}

/// Parse a `Stripe-Signature` header.
///
/// Unknown schemes (`v0`, ...) and undecodable `v1` entries are skipped.
pub fn parse_signature_header(header: &str) -> Result<SignatureHeader, SignatureError> {
    if header.trim().is_empty() {
        return Err(SignatureError::MissingHeader);
    }

    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                let parsed = value.parse::<i64>().map_err(|_| {
                    SignatureError::MalformedHeader(format!("invalid timestamp {:?}", value))
                })?;
                timestamp = Some(parsed);
            }
            "v1" => {
                if let Ok(sig) = hex::decode(value) {
                    signatures.push(sig);
                }
            }
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        SignatureError::MalformedHeader("missing timestamp".to_string())
    })?;

    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader(
            "no v1 signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Compute the raw `v1` signature for `payload` signed at `timestamp`
pub fn compute_signature(
    secret: &[u8],
    timestamp: i64,
    payload: &[u8],
) -> Result<Vec<u8>, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| SignatureError::MissingSecret)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Build a `Stripe-Signature` header value, as Stripe would send it.
///
/// Used by tests and local tooling that replay events.
pub fn sign_header(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, SignatureError> {
    let sig = compute_signature(secret.as_bytes(), timestamp, payload)?;
    Ok(format!("t={},v1={}", timestamp, hex::encode(sig)))
}

/// Verify `header` over `payload` at time `now`.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: DateTime<Utc>,
) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::MissingSecret);
    }

    let parsed = parse_signature_header(header)?;

    // Any i64 parses as `t`; an unrepresentable age is out of tolerance.
    let age_secs = now
        .timestamp()
        .checked_sub(parsed.timestamp)
        .and_then(i64::checked_abs)
        .unwrap_or(i64::MAX);
    if age_secs > tolerance_secs {
        return Err(SignatureError::TimestampOutOfTolerance {
            age_secs,
            tolerance_secs,
        });
    }

    let expected = compute_signature(secret.as_bytes(), parsed.timestamp, payload)?;

    // Constant-time comparison against every candidate
    let valid = parsed
        .signatures
        .iter()
        .fold(false, |acc, sig| acc | bool::from(expected.ct_eq(sig)));

    if !valid {
        return Err(SignatureError::Mismatch);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const PAYLOAD: &[u8] = br#"{"id":"evt_1","type":"ping","data":{"object":{}}}"#;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_parse_signature_header() {
        let header = "t=1234567890,v1=abc123,v1=def456,v0=ffff";
        let parsed = parse_signature_header(header).unwrap();

        assert_eq!(parsed.timestamp, 1234567890);
        assert_eq!(parsed.signatures.len(), 2);
        assert_eq!(parsed.signatures[0], vec![0xab, 0xc1, 0x23]);
    }

    #[test]
    fn test_parse_rejects_incomplete_headers() {
        assert!(matches!(
            parse_signature_header(""),
            Err(SignatureError::MissingHeader)
        ));
        assert!(matches!(
            parse_signature_header("v1=abc123"),
            Err(SignatureError::MalformedHeader(_))
        ));
        assert!(matches!(
            parse_signature_header("t=123"),
            Err(SignatureError::MalformedHeader(_))
        ));
        assert!(matches!(
            parse_signature_header("t=soon,v1=abc123"),
            Err(SignatureError::MalformedHeader(_))
        ));
        assert!(matches!(
            parse_signature_header("t=123,v1=not-hex"),
            Err(SignatureError::MalformedHeader(_))
        ));
    }

    #[test]
    fn test_hmac_sha256() {
        let sig = compute_signature(SECRET.as_bytes(), 1234567890, b"{}").unwrap();
        assert_eq!(sig.len(), 32);
        assert_eq!(hex::encode(&sig).len(), 64);
    }

    #[test]
    fn test_signed_header_verifies() {
        let header = sign_header(SECRET, now().timestamp(), PAYLOAD).unwrap();
        assert!(verify_signature(PAYLOAD, &header, SECRET, DEFAULT_TOLERANCE_SECS, now()).is_ok());
    }

    #[test]
    fn test_tampered_payload_fails() {
        let header = sign_header(SECRET, now().timestamp(), PAYLOAD).unwrap();
        let tampered = br#"{"id":"evt_1","type":"pong","data":{"object":{}}}"#;

        assert!(matches!(
            verify_signature(tampered, &header, SECRET, DEFAULT_TOLERANCE_SECS, now()),
            Err(SignatureError::Mismatch)
        ));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let header = sign_header("whsec_other", now().timestamp(), PAYLOAD).unwrap();

        assert!(matches!(
            verify_signature(PAYLOAD, &header, SECRET, DEFAULT_TOLERANCE_SECS, now()),
            Err(SignatureError::Mismatch)
        ));
    }

    #[test]
    fn test_any_matching_v1_is_accepted() {
        let good = sign_header(SECRET, now().timestamp(), PAYLOAD).unwrap();
        let good_sig = good.split_once(",v1=").unwrap().1;
        let header = format!("t={},v1={},v1={}", now().timestamp(), "00".repeat(32), good_sig);

        assert!(verify_signature(PAYLOAD, &header, SECRET, DEFAULT_TOLERANCE_SECS, now()).is_ok());
    }

    #[test]
    fn test_stale_timestamp_fails() {
        let signed_at = now().timestamp() - 600;
        let header = sign_header(SECRET, signed_at, PAYLOAD).unwrap();

        assert!(matches!(
            verify_signature(PAYLOAD, &header, SECRET, DEFAULT_TOLERANCE_SECS, now()),
            Err(SignatureError::TimestampOutOfTolerance { age_secs: 600, .. })
        ));
    }

    #[test]
    fn test_future_timestamp_outside_tolerance_fails() {
        let header = sign_header(SECRET, now().timestamp() + 301, PAYLOAD).unwrap();

        assert!(matches!(
            verify_signature(PAYLOAD, &header, SECRET, DEFAULT_TOLERANCE_SECS, now()),
            Err(SignatureError::TimestampOutOfTolerance { .. })
        ));
    }

    #[test]
    fn test_age_equal_to_tolerance_is_accepted() {
        let signed_at = now().timestamp() - DEFAULT_TOLERANCE_SECS;
        let header = sign_header(SECRET, signed_at, PAYLOAD).unwrap();

        assert!(verify_signature(PAYLOAD, &header, SECRET, DEFAULT_TOLERANCE_SECS, now()).is_ok());

        let header = sign_header(SECRET, signed_at - 1, PAYLOAD).unwrap();
        assert!(matches!(
            verify_signature(PAYLOAD, &header, SECRET, DEFAULT_TOLERANCE_SECS, now()),
            Err(SignatureError::TimestampOutOfTolerance { age_secs: 301, .. })
        ));
    }

    #[test]
    fn test_extreme_timestamps_are_out_of_tolerance() {
        for t in [i64::MIN, i64::MIN + 1, i64::MAX] {
            let header = format!("t={},v1={}", t, "00".repeat(32));

            assert!(matches!(
                verify_signature(PAYLOAD, &header, SECRET, DEFAULT_TOLERANCE_SECS, now()),
                Err(SignatureError::TimestampOutOfTolerance { .. })
            ));
        }
    }

    #[test]
    fn test_empty_secret_fails_closed() {
        let header = sign_header("", now().timestamp(), PAYLOAD).unwrap();

        assert!(matches!(
            verify_signature(PAYLOAD, &header, "", DEFAULT_TOLERANCE_SECS, now()),
            Err(SignatureError::MissingSecret)
        ));
    }
}
