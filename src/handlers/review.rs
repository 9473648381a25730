use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    dtos::review::CreateReviewRequest, errors::AppError, middleware::CurrentUser,
    utils::ValidatedJson, AppState,
};

pub async fn add_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(book_uid): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Reviews only attach to known books.
    state
        .db
        .get_book(book_uid)
        .await?
        .ok_or(AppError::BookNotFound)?;

    let review = state
        .db
        .create_review(user.uid, book_uid, req.rating, &req.review_text)
        .await?;

    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn list_reviews(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let reviews = state.db.list_reviews().await?;
    Ok(Json(reviews))
}

pub async fn get_review(
    State(state): State<AppState>,
    Path(review_uid): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let review = state
        .db
        .get_review(review_uid)
        .await?
        .ok_or(AppError::ReviewNotFound)?;
    Ok(Json(review))
}

pub async fn list_book_reviews(
    State(state): State<AppState>,
    Path(book_uid): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    state
        .db
        .get_book(book_uid)
        .await?
        .ok_or(AppError::BookNotFound)?;

    let reviews = state.db.list_reviews_for_book(book_uid).await?;
    Ok(Json(reviews))
}

pub async fn delete_review(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(review_uid): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = state.db.delete_review(review_uid, user.uid).await?;
    if deleted == 0 {
        return Err(AppError::ReviewNotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
