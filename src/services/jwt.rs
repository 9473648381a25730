//! Token codec: issues and verifies the signed session tokens (access and
//! refresh) that carry the embedded claims payload.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::JwtConfig;

/// The principal payload embedded under the `user` claim key.
///
/// Access tokens carry the role; refresh tokens omit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUser {
    pub email: String,
    pub user_uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Full claims structure of an issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub user: TokenUser,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Unique token identifier, the revocation key.
    pub jti: String,
    /// True for refresh tokens, false for access tokens.
    pub refresh: bool,
}

/// Signs and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    access_token_expiry_minutes: i64,
    refresh_token_expiry_days: i64,
}

impl TokenCodec {
    pub fn new(config: &JwtConfig) -> Result<Self, anyhow::Error> {
        let algorithm: Algorithm = config
            .algorithm
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid JWT algorithm '{}': {}", config.algorithm, e))?;

        // Shared-secret scheme: only the HMAC family is valid here.
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(anyhow::anyhow!(
                "Unsupported JWT algorithm '{}': expected an HMAC variant",
                config.algorithm
            ));
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            algorithm,
            access_token_expiry_minutes: config.access_token_expiry_minutes,
            refresh_token_expiry_days: config.refresh_token_expiry_days,
        })
    }

    /// Issue a token for `user` with the given validity window. Each call
    /// mints a fresh `jti`.
    pub fn create_token(
        &self,
        user: &TokenUser,
        expiry: Duration,
        refresh: bool,
    ) -> Result<String, anyhow::Error> {
        let claims = TokenClaims {
            user: user.clone(),
            exp: (Utc::now() + expiry).timestamp(),
            jti: Uuid::new_v4().to_string(),
            refresh,
        };

        let header = Header::new(self.algorithm);
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode token: {}", e))?;

        Ok(token)
    }

    /// Issue an access token with the default expiry.
    pub fn access_token(&self, user: &TokenUser) -> Result<String, anyhow::Error> {
        self.create_token(
            user,
            Duration::minutes(self.access_token_expiry_minutes),
            false,
        )
    }

    /// Issue a refresh token with the multi-day expiry.
    pub fn refresh_token(&self, user: &TokenUser) -> Result<String, anyhow::Error> {
        self.create_token(user, Duration::days(self.refresh_token_expiry_days), true)
    }

    /// Verify signature and expiry. Returns None on expiry, signature
    /// mismatch, malformed input, or any other decode failure; the caller
    /// cannot distinguish them. Failures are logged here.
    pub fn verify_token(&self, token: &str) -> Option<TokenClaims> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;
        // Expiry is checked against the current clock, no skew compensation.
        validation.leeway = 0;

        match decode::<TokenClaims>(token, &self.decoding_key, &validation) {
            Ok(token_data) => Some(token_data.claims),
            Err(e) => {
                tracing::warn!(error = %e, "Token verification failed");
                None
            }
        }
    }

    pub fn access_token_expiry(&self) -> Duration {
        Duration::minutes(self.access_token_expiry_minutes)
    }

    pub fn access_token_expiry_seconds(&self) -> i64 {
        self.access_token_expiry_minutes * 60
    }
}
