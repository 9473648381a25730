use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    dtos::auth::{
        LoginRequest, MessageResponse, PasswordResetRequest, SetPasswordRequest, SignupRequest,
        TokenResponse, UserProfileResponse,
    },
    errors::AppError,
    middleware::{AuthClaims, CurrentUser},
    utils::ValidatedJson,
    AppState,
};

/// Create an account and send a verification link.
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state.auth.signup(req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Complete account verification from an emailed link token.
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.verify_email(&token).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Account verified successfully".to_string(),
        }),
    ))
}

/// Exchange credentials for an access + refresh token pair.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let res = state.auth.login(req).await?;
    Ok((StatusCode::CREATED, Json(res)))
}

/// Mint a new access token from a refresh token.
pub async fn refresh_token(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
) -> Result<impl IntoResponse, AppError> {
    let access_token = state.auth.refresh(&claims)?;
    Ok((StatusCode::OK, Json(TokenResponse { access_token })))
}

/// Revoke the presented access token.
pub async fn logout(
    State(state): State<AppState>,
    AuthClaims(claims): AuthClaims,
) -> Result<impl IntoResponse, AppError> {
    state.auth.logout(&claims).await?;
    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    ))
}

/// Current principal with their books and reviews.
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let books = state.db.list_books_by_user(user.uid).await?;
    let reviews = state.db.list_reviews_by_user(user.uid).await?;

    Ok(Json(UserProfileResponse {
        user,
        books,
        reviews,
    }))
}

/// Send a password-reset link to a known account.
pub async fn reset_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<PasswordResetRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.request_password_reset(&req.email).await?;
    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "Please check your email for instructions to reset your password".to_string(),
        }),
    ))
}

/// Set a new password from an emailed reset link token.
pub async fn set_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    ValidatedJson(req): ValidatedJson<SetPasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state.auth.set_password(&token, req).await?;
    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "Password updated successfully".to_string(),
        }),
    ))
}
