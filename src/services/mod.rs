pub mod auth;
pub mod blocklist;
pub mod email;
pub mod jwt;
pub mod link_token;
pub mod mailer;

pub use auth::{AuthService, LinkClaims};
pub use blocklist::{MockBlocklist, RedisBlocklist, TokenBlocklist};
pub use email::{EmailMessage, EmailTransport, MockEmailTransport, SmtpEmailTransport};
pub use jwt::{TokenClaims, TokenCodec, TokenUser};
pub use link_token::UrlSafeSerializer;
pub use mailer::MailQueue;
