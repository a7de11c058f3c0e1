//! Webhook signature verification.
//!
//! PayMongo signs each webhook delivery with HMAC-SHA256 over the raw
//! request body and sends the result in a comma-separated `key=value`
//! header. Verification must run against the untouched raw bytes; any
//! JSON re-serialization before verification invalidates the signature.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::GatewayError;

type HmacSha256 = Hmac<Sha256>;

/// Parsed webhook signature header.
///
/// The header is a comma-separated list of `key=value` pairs. The
/// delivered signature lives under key `s` (hex-encoded); `t` carries
/// the delivery timestamp when present.
#[derive(Debug, Clone)]
pub struct SignatureHeader {
    /// Hex-decoded delivered signature.
    pub signature: Vec<u8>,
    /// Delivery timestamp, if the gateway included one.
    pub timestamp: Option<i64>,
}

impl SignatureHeader {
    /// Parse a raw header value into its components.
    pub fn parse(header: &str) -> Result<Self, GatewayError> {
        let mut signature_hex: Option<&str> = None;
        let mut timestamp: Option<i64> = None;

        for pair in header.split(',') {
            let mut parts = pair.trim().splitn(2, '=');
            let key = parts.next().unwrap_or_default();
            let value = match parts.next() {
                Some(v) => v,
                None => continue,
            };
            match key {
                "s" => signature_hex = Some(value),
                "t" => timestamp = value.parse().ok(),
                _ => {}
            }
        }

        let signature_hex = signature_hex.ok_or_else(|| {
            GatewayError::MalformedSignature("no 's' component in header".to_string())
        })?;

        let signature = hex::decode(signature_hex).map_err(|e| {
            GatewayError::MalformedSignature(format!("signature is not valid hex: {}", e))
        })?;

        Ok(Self {
            signature,
            timestamp,
        })
    }
}

/// Verifies a webhook delivery against the shared webhook secret.
///
/// Computes HMAC-SHA256 over `raw_body` and compares it to the
/// delivered signature in constant time. Returns
/// `GatewayError::InvalidSignature` on mismatch.
pub fn verify_signature(
    raw_body: &[u8],
    header: &SignatureHeader,
    secret: &SecretString,
) -> Result<(), GatewayError> {
    let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
        .expect("HMAC accepts keys of any size");
    mac.update(raw_body);
    let expected = mac.finalize().into_bytes();

    if expected.as_slice().ct_eq(&header.signature).unwrap_u8() != 1 {
        tracing::warn!("webhook signature mismatch");
        return Err(GatewayError::InvalidSignature);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(body: &[u8], secret: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_parse_full_header() {
        let header = SignatureHeader::parse("t=1717200000,s=deadbeef").unwrap();
        assert_eq!(header.timestamp, Some(1717200000));
        assert_eq!(header.signature, vec![0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_parse_signature_only() {
        let header = SignatureHeader::parse("s=00ff").unwrap();
        assert!(header.timestamp.is_none());
        assert_eq!(header.signature, vec![0x00, 0xff]);
    }

    #[test]
    fn test_parse_ignores_unknown_keys() {
        let header = SignatureHeader::parse("t=1,li=abcd,s=0102,te=ffff").unwrap();
        assert_eq!(header.signature, vec![0x01, 0x02]);
    }

    #[test]
    fn test_parse_missing_signature() {
        let result = SignatureHeader::parse("t=1717200000");
        assert!(matches!(result, Err(GatewayError::MalformedSignature(_))));
    }

    #[test]
    fn test_parse_garbage_header() {
        let result = SignatureHeader::parse("garbage");
        assert!(matches!(result, Err(GatewayError::MalformedSignature(_))));
    }

    #[test]
    fn test_parse_non_hex_signature() {
        let result = SignatureHeader::parse("s=not-hex");
        assert!(matches!(result, Err(GatewayError::MalformedSignature(_))));
    }

    #[test]
    fn test_verify_valid_signature() {
        let secret = SecretString::new("whsk_test_secret".to_string());
        let body = br#"{"data":{"attributes":{"type":"checkout_session.payment.paid"}}}"#;
        let header_value = format!("t=1717200000,s={}", sign(body, "whsk_test_secret"));
        let header = SignatureHeader::parse(&header_value).unwrap();

        assert!(verify_signature(body, &header, &secret).is_ok());
    }

    #[test]
    fn test_verify_rejects_wrong_secret() {
        let secret = SecretString::new("whsk_test_secret".to_string());
        let body = b"{}";
        let header_value = format!("s={}", sign(body, "whsk_other_secret"));
        let header = SignatureHeader::parse(&header_value).unwrap();

        assert!(matches!(
            verify_signature(body, &header, &secret),
            Err(GatewayError::InvalidSignature)
        ));
    }

    #[test]
    fn test_verify_rejects_tampered_body() {
        let secret = SecretString::new("whsk_test_secret".to_string());
        let original = br#"{"amount":1000}"#;
        let tampered = br#"{"amount":999999}"#;
        let header_value = format!("s={}", sign(original, "whsk_test_secret"));
        let header = SignatureHeader::parse(&header_value).unwrap();

        assert!(matches!(
            verify_signature(tampered, &header, &secret),
            Err(GatewayError::InvalidSignature)
        ));
    }

    #[test]
    fn test_verify_sensitive_to_whitespace() {
        // Re-serializing JSON changes whitespace and must break the
        // signature, which is why handlers verify the raw bytes.
        let secret = SecretString::new("whsk_test_secret".to_string());
        let original = br#"{"a":1,"b":2}"#;
        let reserialized = br#"{ "a": 1, "b": 2 }"#;
        let header_value = format!("s={}", sign(original, "whsk_test_secret"));
        let header = SignatureHeader::parse(&header_value).unwrap();

        assert!(verify_signature(reserialized, &header, &secret).is_err());
    }
}
