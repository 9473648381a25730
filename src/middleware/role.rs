//! Role guard: resolves the principal behind verified claims and authorizes
//! it against an allowed-role set. Requires a verified account before the
//! role is even considered.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::{errors::AppError, models::{Role, User}, services::TokenClaims, AppState};

/// State for the role-checking middleware: the app state plus the role set
/// a route subtree allows.
#[derive(Clone)]
pub struct RoleGuard {
    state: AppState,
    allowed: Arc<[Role]>,
}

impl RoleGuard {
    pub fn new(state: AppState, allowed: &[Role]) -> Self {
        Self {
            state,
            allowed: allowed.into(),
        }
    }
}

/// Verified-account and role check. Must run behind an access token guard,
/// which put the claims into request extensions.
pub async fn role_guard(
    State(guard): State<RoleGuard>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<TokenClaims>()
        .cloned()
        .ok_or(AppError::InvalidToken)?;

    let user = guard
        .state
        .db
        .find_user_by_email(&claims.user.email)
        .await?
        .ok_or(AppError::UserNotFound)?;

    check_access(&user, &guard.allowed)?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// The pure authorization decision: verification first, then role.
pub fn check_access(user: &User, allowed: &[Role]) -> Result<(), AppError> {
    if !user.is_verified {
        return Err(AppError::AccountNotVerified);
    }

    let role = user.role().ok_or(AppError::InsufficientPermission)?;
    if !allowed.contains(&role) {
        return Err(AppError::InsufficientPermission);
    }

    Ok(())
}

/// Extractor handing the resolved principal to handlers behind a role guard.
pub struct CurrentUser(pub User);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<User>().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("User missing from request extensions"))
        })?;

        Ok(CurrentUser(user.clone()))
    }
}
