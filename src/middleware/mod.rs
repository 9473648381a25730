mod role;
mod token;

pub use role::{check_access, role_guard, CurrentUser, RoleGuard};
pub use token::{access_token_guard, refresh_token_guard, AuthClaims, TokenKind};
