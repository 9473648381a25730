mod book;
mod review;
mod user;

pub use book::Book;
pub use review::Review;
pub use user::{Role, User};
