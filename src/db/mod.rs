//! Database service: PostgreSQL pool plus the user/book/review queries.

use crate::dtos::book::{CreateBookRequest, UpdateBookRequest};
use crate::errors::AppError;
use crate::models::{Book, Review, User};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

/// Fields persisted for a new user. The caller has already hashed the
/// password and decided the role.
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub password_hash: String,
}

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Wrap an existing pool. Tests use this with a lazy pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // User operations
    // -------------------------------------------------------------------------

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT uid, username, email, first_name, last_name, role, is_verified,
                   password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    pub async fn find_user_by_uid(&self, uid: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT uid, username, email, first_name, last_name, role, is_verified,
                   password_hash, created_at, updated_at
            FROM users
            WHERE uid = $1
            "#,
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn create_user(&self, input: &NewUser) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (uid, username, email, first_name, last_name, role,
                               is_verified, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, FALSE, $7)
            RETURNING uid, username, email, first_name, last_name, role, is_verified,
                      password_hash, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.username)
        .bind(&input.email)
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.role)
        .bind(&input.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::UserAlreadyExists
            }
            _ => AppError::Database(e),
        })?;

        info!(user_uid = %user.uid, "User created");

        Ok(user)
    }

    pub async fn mark_user_verified(&self, email: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET is_verified = TRUE, updated_at = now()
            WHERE email = $1
            "#,
        )
        .bind(email)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn update_password_hash(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET password_hash = $2, updated_at = now()
            WHERE email = $1
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    // -------------------------------------------------------------------------
    // Book operations
    // -------------------------------------------------------------------------

    pub async fn list_books(&self) -> Result<Vec<Book>, AppError> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT uid, title, author, publisher, published_date, page_count,
                   language, user_uid, created_at, updated_at
            FROM books
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    pub async fn list_books_by_user(&self, user_uid: Uuid) -> Result<Vec<Book>, AppError> {
        let books = sqlx::query_as::<_, Book>(
            r#"
            SELECT uid, title, author, publisher, published_date, page_count,
                   language, user_uid, created_at, updated_at
            FROM books
            WHERE user_uid = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_uid)
        .fetch_all(&self.pool)
        .await?;

        Ok(books)
    }

    pub async fn get_book(&self, uid: Uuid) -> Result<Option<Book>, AppError> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            SELECT uid, title, author, publisher, published_date, page_count,
                   language, user_uid, created_at, updated_at
            FROM books
            WHERE uid = $1
            "#,
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    #[instrument(skip(self, input), fields(title = %input.title))]
    pub async fn create_book(
        &self,
        input: &CreateBookRequest,
        user_uid: Uuid,
    ) -> Result<Book, AppError> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (uid, title, author, publisher, published_date,
                               page_count, language, user_uid)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING uid, title, author, publisher, published_date, page_count,
                      language, user_uid, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.title)
        .bind(&input.author)
        .bind(&input.publisher)
        .bind(input.published_date)
        .bind(input.page_count)
        .bind(&input.language)
        .bind(user_uid)
        .fetch_one(&self.pool)
        .await?;

        info!(book_uid = %book.uid, "Book created");

        Ok(book)
    }

    pub async fn update_book(
        &self,
        uid: Uuid,
        input: &UpdateBookRequest,
    ) -> Result<Option<Book>, AppError> {
        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = $2, author = $3, publisher = $4, published_date = $5,
                language = $6, updated_at = now()
            WHERE uid = $1
            RETURNING uid, title, author, publisher, published_date, page_count,
                      language, user_uid, created_at, updated_at
            "#,
        )
        .bind(uid)
        .bind(&input.title)
        .bind(&input.author)
        .bind(&input.publisher)
        .bind(input.published_date)
        .bind(&input.language)
        .fetch_optional(&self.pool)
        .await?;

        Ok(book)
    }

    pub async fn delete_book(&self, uid: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM books WHERE uid = $1")
            .bind(uid)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    // -------------------------------------------------------------------------
    // Review operations
    // -------------------------------------------------------------------------

    pub async fn create_review(
        &self,
        user_uid: Uuid,
        book_uid: Uuid,
        rating: i32,
        review_text: &str,
    ) -> Result<Review, AppError> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (uid, rating, review_text, user_uid, book_uid)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING uid, rating, review_text, user_uid, book_uid, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(rating)
        .bind(review_text)
        .bind(user_uid)
        .bind(book_uid)
        .fetch_one(&self.pool)
        .await?;

        info!(review_uid = %review.uid, book_uid = %book_uid, "Review created");

        Ok(review)
    }

    pub async fn list_reviews(&self) -> Result<Vec<Review>, AppError> {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT uid, rating, review_text, user_uid, book_uid, created_at, updated_at
            FROM reviews
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    pub async fn get_review(&self, uid: Uuid) -> Result<Option<Review>, AppError> {
        let review = sqlx::query_as::<_, Review>(
            r#"
            SELECT uid, rating, review_text, user_uid, book_uid, created_at, updated_at
            FROM reviews
            WHERE uid = $1
            "#,
        )
        .bind(uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(review)
    }

    pub async fn list_reviews_for_book(&self, book_uid: Uuid) -> Result<Vec<Review>, AppError> {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT uid, rating, review_text, user_uid, book_uid, created_at, updated_at
            FROM reviews
            WHERE book_uid = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(book_uid)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    pub async fn list_reviews_by_user(&self, user_uid: Uuid) -> Result<Vec<Review>, AppError> {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT uid, rating, review_text, user_uid, book_uid, created_at, updated_at
            FROM reviews
            WHERE user_uid = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_uid)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }

    /// Delete a review owned by `user_uid`. Rows owned by someone else are
    /// left alone, which surfaces as not-found to the caller.
    pub async fn delete_review(&self, uid: Uuid, user_uid: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM reviews WHERE uid = $1 AND user_uid = $2")
            .bind(uid)
            .bind(user_uid)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
