use ring::signature::{UnparsedPublicKey, ED25519};

pub const SIGNATURE_HEADER: &str = "x-signature-ed25519";
pub const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

/// How far a signed timestamp may drift from the local clock, in seconds.
pub const MAX_TIMESTAMP_SKEW_SECS: i64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum SignatureError {
    #[error("public key is not valid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("public key must be 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Checks that an interaction request was signed by Discord with the
/// application's key.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    public_key: UnparsedPublicKey<Vec<u8>>,
}

impl SignatureVerifier {
    pub fn from_hex(public_key: &str) -> Result<Self, SignatureError> {
        let bytes = hex::decode(public_key.trim())?;
        if bytes.len() != 32 {
            return Err(SignatureError::InvalidLength(bytes.len()));
        }
        Ok(Self {
            public_key: UnparsedPublicKey::new(&ED25519, bytes),
        })
    }

    /// The signed message is the timestamp header followed by the raw body.
    pub fn verify(&self, timestamp: &str, body: &[u8], signature_hex: &str) -> bool {
        let Ok(signature) = hex::decode(signature_hex) else {
            return false;
        };

        let mut message = Vec::with_capacity(timestamp.len() + body.len());
        message.extend_from_slice(timestamp.as_bytes());
        message.extend_from_slice(body);

        self.public_key.verify(&message, &signature).is_ok()
    }
}

/// Rejects replays of old signed requests. `now` is unix seconds.
pub fn is_fresh(timestamp: &str, now: i64) -> bool {
    match timestamp.trim().parse::<i64>() {
        Ok(signed_at) => (now - signed_at).abs() <= MAX_TIMESTAMP_SKEW_SECS,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_util::{sign_interaction, test_keypair, test_public_key_hex};

    #[test]
    fn test_accepts_valid_signature() {
        let verifier = SignatureVerifier::from_hex(&test_public_key_hex()).unwrap();
        let body = br#"{"type":1}"#;
        let signature = sign_interaction(&test_keypair(), "1700000000", body);

        assert!(verifier.verify("1700000000", body, &signature));
    }

    #[test]
    fn test_rejects_tampered_body_and_timestamp() {
        let verifier = SignatureVerifier::from_hex(&test_public_key_hex()).unwrap();
        let signature = sign_interaction(&test_keypair(), "1700000000", br#"{"type":1}"#);

        assert!(!verifier.verify("1700000000", br#"{"type":2}"#, &signature));
        assert!(!verifier.verify("1700000001", br#"{"type":1}"#, &signature));
        assert!(!verifier.verify("1700000000", br#"{"type":1}"#, "not-hex"));
    }

    #[test]
    fn test_timestamp_freshness() {
        let now = 1_700_000_000;
        assert!(is_fresh("1700000000", now));
        assert!(is_fresh("1699999700", now));
        assert!(is_fresh("1700000300", now));
        assert!(!is_fresh("1699999699", now));
        assert!(!is_fresh("1700000301", now));
        assert!(!is_fresh("yesterday", now));
        assert!(!is_fresh("", now));
    }

    #[test]
    fn test_rejects_bad_public_keys() {
        assert!(matches!(
            SignatureVerifier::from_hex("zz"),
            Err(SignatureError::InvalidHex(_))
        ));
        assert!(matches!(
            SignatureVerifier::from_hex("abcd"),
            Err(SignatureError::InvalidLength(2))
        ));
    }
}
