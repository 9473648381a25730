pub mod config;
pub mod db;
pub mod dtos;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod telemetry;
pub mod utils;

use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::Database;
use crate::errors::AppError;
use crate::middleware::{access_token_guard, refresh_token_guard, role_guard, RoleGuard};
use crate::models::Role;
use crate::services::{AuthService, TokenBlocklist, TokenCodec};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub codec: TokenCodec,
    pub blocklist: Arc<dyn TokenBlocklist>,
    pub auth: AuthService,
}

pub fn build_router(state: AppState) -> Router {
    // Routes that need a resolved, verified principal with an allowed role.
    let role_checked = Router::new()
        .route("/auth/me", get(handlers::auth::me))
        .route(
            "/books",
            get(handlers::book::list_books).post(handlers::book::create_book),
        )
        .route(
            "/books/:book_uid",
            get(handlers::book::get_book)
                .patch(handlers::book::update_book)
                .delete(handlers::book::delete_book),
        )
        .route("/reviews", get(handlers::review::list_reviews))
        .route(
            "/reviews/book/:book_uid",
            get(handlers::review::list_book_reviews).post(handlers::review::add_review),
        )
        .route(
            "/reviews/:review_uid",
            get(handlers::review::get_review).delete(handlers::review::delete_review),
        )
        .layer(from_fn_with_state(
            RoleGuard::new(state.clone(), &[Role::User, Role::Admin]),
            role_guard,
        ));

    // Access-token territory: logout needs only verified claims, the rest
    // additionally pass the role guard above.
    let access_protected = Router::new()
        .route("/auth/logout", get(handlers::auth::logout))
        .merge(role_checked)
        .layer(from_fn_with_state(state.clone(), access_token_guard));

    let refresh_protected = Router::new()
        .route("/auth/refresh_token", get(handlers::auth::refresh_token))
        .layer(from_fn_with_state(state.clone(), refresh_token_guard));

    Router::new()
        .route("/health", get(health_check))
        .route("/auth/signup", post(handlers::auth::signup))
        .route("/auth/verify/:token", get(handlers::auth::verify_email))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/reset_password", post(handlers::auth::reset_password))
        .route(
            "/auth/set_password/:token",
            post(handlers::auth::set_password),
        )
        .merge(access_protected)
        .merge(refresh_protected)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(CorsLayer::permissive())
}

/// Service health check: Postgres and the revocation store must answer.
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.db.health_check().await?;
    state.blocklist.health_check().await?;

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "service": state.config.service_name,
        "checks": {
            "postgres": "up",
            "redis": "up"
        }
    })))
}
