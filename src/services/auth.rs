//! Auth service: orchestrates signup, login, logout, refresh, email
//! verification, and password reset against the user store.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::{
    db::{Database, NewUser},
    dtos::auth::{LoginRequest, LoginResponse, SetPasswordRequest, SignupRequest, UserSummary},
    errors::AppError,
    models::{Role, User},
    services::{
        email::{password_reset_message, verification_message},
        MailQueue, TokenBlocklist, TokenClaims, TokenCodec, TokenUser, UrlSafeSerializer,
    },
    utils::{hash_password, verify_password, Password, PasswordHashString},
};

/// Payload embedded in email-link tokens. Purpose (verify vs. reset) is
/// enforced by the route that decodes it, not by the token content.
#[derive(Debug, Serialize, Deserialize)]
pub struct LinkClaims {
    pub email: String,
}

#[derive(Clone)]
pub struct AuthService {
    db: Database,
    codec: TokenCodec,
    blocklist: Arc<dyn TokenBlocklist>,
    serializer: UrlSafeSerializer,
    mailer: MailQueue,
    public_url: String,
}

impl AuthService {
    pub fn new(
        db: Database,
        codec: TokenCodec,
        blocklist: Arc<dyn TokenBlocklist>,
        serializer: UrlSafeSerializer,
        mailer: MailQueue,
        public_url: String,
    ) -> Self {
        Self {
            db,
            codec,
            blocklist,
            serializer,
            mailer,
            public_url,
        }
    }

    pub async fn signup(&self, req: SignupRequest) -> Result<User, AppError> {
        if self.db.find_user_by_email(&req.email).await?.is_some() {
            return Err(AppError::UserAlreadyExists);
        }

        let password_hash = self.hash_off_thread(req.password.clone()).await?;

        let user = self
            .db
            .create_user(&NewUser {
                username: req.username,
                email: req.email,
                first_name: req.first_name,
                last_name: req.last_name,
                role: Role::User.as_str().to_string(),
                password_hash: password_hash.into_string(),
            })
            .await?;

        tracing::info!(user_uid = %user.uid, "User signed up");

        // Verification mail is fire-and-forget; the queue retries delivery
        // and a failure there never rolls back the signup.
        match self.serializer.dumps(&LinkClaims {
            email: user.email.clone(),
        }) {
            Ok(token) => {
                let link = format!("{}/auth/verify/{}", self.public_url, token);
                self.mailer.enqueue(verification_message(&user.email, &link));
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to build verification token");
            }
        }

        Ok(user)
    }

    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AppError> {
        // Unknown email and wrong password collapse into the same error so
        // responses carry no enumeration signal.
        let user = self
            .db
            .find_user_by_email(&req.email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let hash = PasswordHashString::new(user.password_hash.clone());
        let ok = self.verify_off_thread(req.password, hash).await?;
        if !ok {
            return Err(AppError::UserNotFound);
        }

        let access_payload = TokenUser {
            email: user.email.clone(),
            user_uid: user.uid.to_string(),
            role: Some(user.role.clone()),
        };
        let refresh_payload = TokenUser {
            email: user.email.clone(),
            user_uid: user.uid.to_string(),
            role: None,
        };

        let access_token = self.codec.access_token(&access_payload)?;
        let refresh_token = self.codec.refresh_token(&refresh_payload)?;

        tracing::info!(user_uid = %user.uid, "User logged in");

        Ok(LoginResponse {
            message: "Login successful".to_string(),
            access_token,
            refresh_token,
            user: UserSummary::from(&user),
        })
    }

    /// Issue a new access token from verified refresh claims. The expiry
    /// re-check duplicates the codec's own validation on purpose.
    pub fn refresh(&self, claims: &TokenClaims) -> Result<String, AppError> {
        if claims.exp <= Utc::now().timestamp() {
            return Err(AppError::RefreshTokenRequired);
        }

        let access_token = self.codec.access_token(&claims.user)?;
        Ok(access_token)
    }

    /// Revoke the access token's `jti` for its remaining validity. Refresh
    /// tokens are not revoked here and stay valid until natural expiry.
    pub async fn logout(&self, claims: &TokenClaims) -> Result<(), AppError> {
        let remaining = claims.exp - Utc::now().timestamp();
        if remaining > 0 {
            self.blocklist.revoke(&claims.jti, remaining).await?;
        }

        tracing::info!(jti = %claims.jti, "Access token revoked");
        Ok(())
    }

    pub async fn verify_email(&self, token: &str) -> Result<User, AppError> {
        let claims: LinkClaims = self
            .serializer
            .loads(token)
            .ok_or(AppError::InvalidCredentials)?;

        let user = self
            .db
            .find_user_by_email(&claims.email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        self.db.mark_user_verified(&claims.email).await?;

        tracing::info!(user_uid = %user.uid, "Account verified");
        Ok(user)
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), AppError> {
        let user = self
            .db
            .find_user_by_email(email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let token = self.serializer.dumps(&LinkClaims {
            email: user.email.clone(),
        })?;
        let link = format!("{}/auth/set_password/{}", self.public_url, token);
        self.mailer
            .enqueue(password_reset_message(&user.email, &link));

        tracing::info!(user_uid = %user.uid, "Password reset requested");
        Ok(())
    }

    pub async fn set_password(&self, token: &str, req: SetPasswordRequest) -> Result<(), AppError> {
        // Mismatch is rejected before any decode or persistence work.
        if req.new_password != req.confirm_new_password {
            return Err(AppError::PasswordMismatch);
        }

        let claims: LinkClaims = self
            .serializer
            .loads(token)
            .ok_or(AppError::InvalidCredentials)?;

        let user = self
            .db
            .find_user_by_email(&claims.email)
            .await?
            .ok_or(AppError::UserNotFound)?;

        let password_hash = self.hash_off_thread(req.new_password).await?;
        self.db
            .update_password_hash(&user.email, password_hash.as_str())
            .await?;

        tracing::info!(user_uid = %user.uid, "Password updated");
        Ok(())
    }

    /// Argon2 is CPU-bound; keep it off the async scheduler.
    async fn hash_off_thread(&self, password: String) -> Result<PasswordHashString, AppError> {
        let password = Password::new(password);
        let hash = tokio::task::spawn_blocking(move || hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Hashing task failed: {}", e)))??;
        Ok(hash)
    }

    async fn verify_off_thread(
        &self,
        password: String,
        hash: PasswordHashString,
    ) -> Result<bool, AppError> {
        let password = Password::new(password);
        let ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Verify task failed: {}", e)))?;
        Ok(ok)
    }
}
