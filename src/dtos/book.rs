use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBookRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,

    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,

    #[validate(length(min = 1, message = "Publisher is required"))]
    pub publisher: String,

    pub published_date: NaiveDate,

    #[validate(range(min = 1, message = "Page count must be positive"))]
    pub page_count: i32,

    #[validate(length(min = 1, message = "Language is required"))]
    pub language: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBookRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,

    #[validate(length(min = 1, message = "Author is required"))]
    pub author: String,

    #[validate(length(min = 1, message = "Publisher is required"))]
    pub publisher: String,

    pub published_date: NaiveDate,

    #[validate(length(min = 1, message = "Language is required"))]
    pub language: String,
}
