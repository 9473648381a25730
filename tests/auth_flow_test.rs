//! End-to-end account lifecycle against a real Postgres instance.
//!
//! Run with: `cargo test -- --ignored` with DATABASE_URL pointing at a
//! disposable database.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use booker::{
    build_router,
    db::Database,
    services::{
        AuthService, MailQueue, MockBlocklist, MockEmailTransport, TokenBlocklist, TokenCodec,
        UrlSafeSerializer,
    },
    AppState,
};
use common::{body_json, get_with_bearer, test_config};
use tower::util::ServiceExt;
use uuid::Uuid;

struct LiveApp {
    state: AppState,
    mail: Arc<MockEmailTransport>,
}

impl LiveApp {
    async fn new() -> Self {
        let mut config = test_config();
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .expect("Failed to connect to test database");
        db.run_migrations().await.expect("Failed to run migrations");

        let blocklist = Arc::new(MockBlocklist::new()) as Arc<dyn TokenBlocklist>;
        let mail = Arc::new(MockEmailTransport::new());
        let mailer = MailQueue::start_with(mail.clone(), 0, Duration::from_millis(1));

        let codec = TokenCodec::new(&config.jwt).unwrap();
        let serializer =
            UrlSafeSerializer::new(&config.jwt.secret, config.link_token.max_age_seconds);

        let auth = AuthService::new(
            db.clone(),
            codec.clone(),
            blocklist.clone(),
            serializer,
            mailer,
            config.public_url.clone(),
        );

        let state = AppState {
            config,
            db,
            codec,
            blocklist,
            auth,
        };

        Self { state, mail }
    }

    fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Wait for the mail worker to deliver, then pull the link token out of
    /// the newest message containing `path_marker`.
    async fn link_token_from_mail(&self, path_marker: &str) -> String {
        for _ in 0..200 {
            {
                let sent = self.mail.sent.lock().unwrap();
                if let Some(message) = sent
                    .iter()
                    .rev()
                    .find(|m| m.plain_body.contains(path_marker))
                {
                    let start = message.plain_body.find(path_marker).unwrap() + path_marker.len();
                    let rest = &message.plain_body[start..];
                    let end = rest
                        .find(char::is_whitespace)
                        .unwrap_or(rest.len());
                    return rest[..end].to_string();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("No email containing {} was delivered", path_marker);
    }
}

/// Sign up a fresh account, follow the verification link, log in. Returns
/// the email and a usable access token.
async fn verified_user(app: &LiveApp) -> (String, String) {
    let email = format!("u{}@example.com", &Uuid::new_v4().simple().to_string()[..8]);

    let response = app
        .router()
        .oneshot(post_json(
            "/auth/signup",
            serde_json::json!({
                "email": email,
                "username": "reader",
                "first_name": "Test",
                "last_name": "Reader",
                "password": "secret-1"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let token = app.link_token_from_mail("/auth/verify/").await;
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri(format!("/auth/verify/{}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .router()
        .oneshot(post_json(
            "/auth/login",
            serde_json::json!({ "email": email, "password": "secret-1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let access_token = body["access_token"].as_str().unwrap().to_string();

    (email, access_token)
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_json_with_bearer(uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn delete_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn test_signup_verify_login_lifecycle() {
    let app = LiveApp::new().await;
    let email = format!("u{}@example.com", &Uuid::new_v4().simple().to_string()[..8]);

    // Signup creates an unverified account and queues a verification mail.
    let response = app
        .router()
        .oneshot(post_json(
            "/auth/signup",
            serde_json::json!({
                "email": email,
                "username": "reader",
                "first_name": "Test",
                "last_name": "Reader",
                "password": "secret-1"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["email"], email);
    assert_eq!(body["is_verified"], false);
    assert!(body.get("password_hash").is_none());

    // Duplicate signup is refused.
    let response = app
        .router()
        .oneshot(post_json(
            "/auth/signup",
            serde_json::json!({
                "email": email,
                "username": "reader",
                "first_name": "Test",
                "last_name": "Reader",
                "password": "secret-1"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error_code"], "user_already_exists");

    // Login works before verification, but guarded routes refuse the account.
    let response = app
        .router()
        .oneshot(post_json(
            "/auth/login",
            serde_json::json!({ "email": email, "password": "secret-1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    let access_token = body["access_token"].as_str().unwrap().to_string();

    let response = app
        .router()
        .oneshot(get_with_bearer("/auth/me", &access_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error_code"], "account_not_verified");

    // Follow the emailed verification link.
    let token = app.link_token_from_mail("/auth/verify/").await;
    let response = app
        .router()
        .oneshot(
            Request::builder()
                .uri(format!("/auth/verify/{}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    // The profile route now resolves the verified principal.
    let response = app
        .router()
        .oneshot(get_with_bearer("/auth/me", &access_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["email"], email);
    assert_eq!(body["books"], serde_json::json!([]));
    assert_eq!(body["reviews"], serde_json::json!([]));
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn test_login_failures_are_indistinguishable() {
    let app = LiveApp::new().await;
    let email = format!("u{}@example.com", &Uuid::new_v4().simple().to_string()[..8]);

    app.router()
        .oneshot(post_json(
            "/auth/signup",
            serde_json::json!({
                "email": email,
                "username": "reader",
                "first_name": "Test",
                "last_name": "Reader",
                "password": "secret-1"
            }),
        ))
        .await
        .unwrap();

    // Wrong password and unknown account produce the same response, so a
    // caller cannot probe which addresses are registered.
    let wrong_password = app
        .router()
        .oneshot(post_json(
            "/auth/login",
            serde_json::json!({ "email": email, "password": "wrong-password" }),
        ))
        .await
        .unwrap();
    let unknown_account = app
        .router()
        .oneshot(post_json(
            "/auth/login",
            serde_json::json!({ "email": "nobody@example.com", "password": "secret-1" }),
        ))
        .await
        .unwrap();

    assert_eq!(wrong_password.status(), StatusCode::NOT_FOUND);
    assert_eq!(unknown_account.status(), StatusCode::NOT_FOUND);

    let a = body_json(wrong_password).await;
    let b = body_json(unknown_account).await;
    assert_eq!(a, b);
    assert_eq!(a["error_code"], "user_not_found");
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn test_password_reset_flow() {
    let app = LiveApp::new().await;
    let email = format!("u{}@example.com", &Uuid::new_v4().simple().to_string()[..8]);

    app.router()
        .oneshot(post_json(
            "/auth/signup",
            serde_json::json!({
                "email": email,
                "username": "reader",
                "first_name": "Test",
                "last_name": "Reader",
                "password": "old-secret"
            }),
        ))
        .await
        .unwrap();

    let response = app
        .router()
        .oneshot(post_json(
            "/auth/reset_password",
            serde_json::json!({ "email": email }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let token = app.link_token_from_mail("/auth/set_password/").await;

    // Mismatched confirmation is refused before the token is consumed.
    let response = app
        .router()
        .oneshot(post_json(
            &format!("/auth/set_password/{}", token),
            serde_json::json!({
                "new_password": "new-secret",
                "confirm_new_password": "different"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error_code"], "passwords_do_not_match");

    // The rejected request changed nothing: the old credential still works.
    let response = app
        .router()
        .oneshot(post_json(
            "/auth/login",
            serde_json::json!({ "email": email, "password": "old-secret" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .router()
        .oneshot(post_json(
            &format!("/auth/set_password/{}", token),
            serde_json::json!({
                "new_password": "new-secret",
                "confirm_new_password": "new-secret"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Old credential is dead, new one works.
    let response = app
        .router()
        .oneshot(post_json(
            "/auth/login",
            serde_json::json!({ "email": email, "password": "old-secret" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .router()
        .oneshot(post_json(
            "/auth/login",
            serde_json::json!({ "email": email, "password": "new-secret" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
#[ignore = "requires a running Postgres instance"]
async fn test_review_read_surface() {
    let app = LiveApp::new().await;
    let (_email, access_token) = verified_user(&app).await;

    let response = app
        .router()
        .oneshot(post_json_with_bearer(
            "/books",
            &access_token,
            serde_json::json!({
                "title": "The Pragmatic Programmer",
                "author": "Hunt & Thomas",
                "publisher": "Addison-Wesley",
                "published_date": "1999-10-30",
                "page_count": 352,
                "language": "en"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let book = body_json(response).await;
    let book_uid = book["uid"].as_str().unwrap().to_string();

    let response = app
        .router()
        .oneshot(post_json_with_bearer(
            &format!("/reviews/book/{}", book_uid),
            &access_token,
            serde_json::json!({ "rating": 5, "review_text": "A classic" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let review = body_json(response).await;
    let review_uid = review["uid"].as_str().unwrap().to_string();

    // The flat listing carries the new review.
    let response = app
        .router()
        .oneshot(get_with_bearer("/reviews", &access_token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let reviews = body_json(response).await;
    assert!(reviews
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["uid"] == review_uid.as_str()));

    // Single-review fetch by uid.
    let response = app
        .router()
        .oneshot(get_with_bearer(
            &format!("/reviews/{}", review_uid),
            &access_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let fetched = body_json(response).await;
    assert_eq!(fetched["rating"], 5);
    assert_eq!(fetched["book_uid"], book_uid.as_str());

    let response = app
        .router()
        .oneshot(get_with_bearer(
            &format!("/reviews/{}", Uuid::new_v4()),
            &access_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error_code"], "review_not_found");

    // Deleting removes it from the read surface.
    let response = app
        .router()
        .oneshot(delete_with_bearer(
            &format!("/reviews/{}", review_uid),
            &access_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .router()
        .oneshot(get_with_bearer(
            &format!("/reviews/{}", review_uid),
            &access_token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
