use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::{
    dtos::book::{CreateBookRequest, UpdateBookRequest},
    errors::AppError,
    middleware::CurrentUser,
    utils::ValidatedJson,
    AppState,
};

pub async fn list_books(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let books = state.db.list_books().await?;
    Ok(Json(books))
}

pub async fn create_book(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(req): ValidatedJson<CreateBookRequest>,
) -> Result<impl IntoResponse, AppError> {
    let book = state.db.create_book(&req, user.uid).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn get_book(
    State(state): State<AppState>,
    Path(book_uid): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let book = state
        .db
        .get_book(book_uid)
        .await?
        .ok_or(AppError::BookNotFound)?;
    Ok(Json(book))
}

pub async fn update_book(
    State(state): State<AppState>,
    Path(book_uid): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateBookRequest>,
) -> Result<impl IntoResponse, AppError> {
    let book = state
        .db
        .update_book(book_uid, &req)
        .await?
        .ok_or(AppError::BookNotFound)?;
    Ok(Json(book))
}

pub async fn delete_book(
    State(state): State<AppState>,
    Path(book_uid): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = state.db.delete_book(book_uid).await?;
    if deleted == 0 {
        return Err(AppError::BookNotFound);
    }
    Ok(StatusCode::NO_CONTENT)
}
