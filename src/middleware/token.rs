//! Token guard: extracts a bearer credential, verifies it, checks the
//! revocation store, and enforces the expected token kind. One shared
//! procedure parameterized by kind; access and refresh differ only in the
//! final predicate.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::{errors::AppError, services::TokenClaims, AppState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    fn check(&self, claims: &TokenClaims) -> Result<(), AppError> {
        match self {
            TokenKind::Access if claims.refresh => Err(AppError::AccessTokenRequired),
            TokenKind::Refresh if !claims.refresh => Err(AppError::RefreshTokenRequired),
            _ => Ok(()),
        }
    }
}

async fn token_guard(
    state: &AppState,
    kind: TokenKind,
    req: &mut Request,
) -> Result<(), AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::InvalidToken)?;

    let claims = state.codec.verify_token(token).ok_or(AppError::InvalidToken)?;

    if state.blocklist.is_revoked(&claims.jti).await? {
        return Err(AppError::RevokedToken);
    }

    kind.check(&claims)?;

    // Downstream handlers read the claims from request extensions.
    req.extensions_mut().insert(claims);
    Ok(())
}

pub async fn access_token_guard(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    token_guard(&state, TokenKind::Access, &mut req).await?;
    Ok(next.run(req).await)
}

pub async fn refresh_token_guard(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    token_guard(&state, TokenKind::Refresh, &mut req).await?;
    Ok(next.run(req).await)
}

/// Extractor handing verified claims to handlers behind a token guard.
pub struct AuthClaims(pub TokenClaims);

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthClaims
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let claims = parts.extensions.get::<TokenClaims>().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "Auth claims missing from request extensions"
            ))
        })?;

        Ok(AuthClaims(claims.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::TokenUser;

    fn claims(refresh: bool) -> TokenClaims {
        TokenClaims {
            user: TokenUser {
                email: "a@x.com".to_string(),
                user_uid: "uid".to_string(),
                role: None,
            },
            exp: 0,
            jti: "jti".to_string(),
            refresh,
        }
    }

    #[test]
    fn test_kind_predicate() {
        assert!(TokenKind::Access.check(&claims(false)).is_ok());
        assert!(TokenKind::Refresh.check(&claims(true)).is_ok());

        assert!(matches!(
            TokenKind::Access.check(&claims(true)),
            Err(AppError::AccessTokenRequired)
        ));
        assert!(matches!(
            TokenKind::Refresh.check(&claims(false)),
            Err(AppError::RefreshTokenRequired)
        ));
    }
}
