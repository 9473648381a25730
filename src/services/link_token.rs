//! URL-safe token codec for email links (account verification, password
//! reset). Tokens are `body.timestamp.signature`, each part base64-url
//! encoded, signed with HMAC-SHA256. The signer enforces a maximum age at
//! decode time; the payload itself carries no expiry field.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{de::DeserializeOwned, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct UrlSafeSerializer {
    key: Vec<u8>,
    max_age_seconds: i64,
}

impl UrlSafeSerializer {
    pub fn new(secret: &str, max_age_seconds: i64) -> Self {
        Self {
            key: secret.as_bytes().to_vec(),
            max_age_seconds,
        }
    }

    /// Serialize, timestamp, and sign a payload into a URL-safe token.
    pub fn dumps<T: Serialize>(&self, payload: &T) -> Result<String, anyhow::Error> {
        self.dumps_at(payload, Utc::now().timestamp())
    }

    fn dumps_at<T: Serialize>(&self, payload: &T, issued_at: i64) -> Result<String, anyhow::Error> {
        let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?);
        let timestamp = URL_SAFE_NO_PAD.encode(issued_at.to_be_bytes());
        let signature = self.sign(&body, &timestamp)?;

        Ok(format!("{}.{}.{}", body, timestamp, signature))
    }

    /// Decode and verify a token. Returns None on any signature, encoding,
    /// or max-age failure; the reasons are logged, not surfaced.
    pub fn loads<T: DeserializeOwned>(&self, token: &str) -> Option<T> {
        match self.try_loads(token) {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::warn!(error = %e, "Link token decode failed");
                None
            }
        }
    }

    fn try_loads<T: DeserializeOwned>(&self, token: &str) -> Result<T, anyhow::Error> {
        let mut parts = token.splitn(3, '.');
        let (body, timestamp, signature) = match (parts.next(), parts.next(), parts.next()) {
            (Some(b), Some(t), Some(s)) => (b, t, s),
            _ => return Err(anyhow::anyhow!("Malformed token")),
        };

        let expected = self.sign(body, timestamp)?;
        let expected_bytes = expected.as_bytes();
        let signature_bytes = signature.as_bytes();
        if expected_bytes.len() != signature_bytes.len()
            || !bool::from(expected_bytes.ct_eq(signature_bytes))
        {
            return Err(anyhow::anyhow!("Signature mismatch"));
        }

        let timestamp_bytes = URL_SAFE_NO_PAD.decode(timestamp)?;
        let issued_at = i64::from_be_bytes(
            timestamp_bytes
                .as_slice()
                .try_into()
                .map_err(|_| anyhow::anyhow!("Bad timestamp length"))?,
        );

        let age = Utc::now().timestamp() - issued_at;
        if age < 0 {
            return Err(anyhow::anyhow!("Token issued in the future"));
        }
        if age > self.max_age_seconds {
            return Err(anyhow::anyhow!("Token older than max age"));
        }

        let payload = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(body)?)?;
        Ok(payload)
    }

    fn sign(&self, body: &str, timestamp: &str) -> Result<String, anyhow::Error> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| anyhow::anyhow!("Invalid key length: {}", e))?;
        mac.update(body.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }
}
