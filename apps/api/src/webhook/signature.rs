use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex HMAC-SHA256 of the raw request body.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Checks `provided` (hex, optionally `sha256=`-prefixed) against the HMAC of
/// `body` under `secret`. The comparison is constant-time.
pub fn verify_signature(secret: &str, body: &[u8], provided: Option<&str>) -> bool {
    let Some(provided) = provided.map(str::trim).filter(|p| !p.is_empty()) else {
        return false;
    };
    let hex_digest = provided.strip_prefix("sha256=").unwrap_or(provided);
    let Ok(expected) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[cfg(test)]
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"message":{"type":"end-of-call-report"}}"#;

    #[test]
    fn test_valid_signature() {
        let sig = sign(SECRET, BODY);
        assert!(verify_signature(SECRET, BODY, Some(&sig)));
        assert!(verify_signature(SECRET, BODY, Some(&format!("sha256={sig}"))));
    }

    #[test]
    fn test_tampered_body_fails() {
        let sig = sign(SECRET, BODY);
        assert!(!verify_signature(SECRET, b"{}", Some(&sig)));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let sig = sign("other", BODY);
        assert!(!verify_signature(SECRET, BODY, Some(&sig)));
    }

    #[test]
    fn test_missing_or_garbage_header_fails() {
        assert!(!verify_signature(SECRET, BODY, None));
        assert!(!verify_signature(SECRET, BODY, Some("")));
        assert!(!verify_signature(SECRET, BODY, Some("not-hex")));
    }
}
