/// Authentication module
///
/// Credential hashing, token signing/verification, the refresh ledger,
/// session resolution, and the rotation protocol tying them together.

mod claims;
pub mod cookies;
mod jwt;
pub mod memory;
mod password;
mod protocol;
mod refresh_token;
mod session;
mod user_store;

pub use claims::{AccessClaims, RefreshClaims, TokenType};
pub use cookies::{CookieSpec, SameSite, ACCESS_COOKIE, REFRESH_COOKIE};
pub use jwt::TokenCodec;
pub use password::hash_password;
pub use password::validate_password_strength;
pub use password::verify_password;
pub use protocol::{AuthService, TokenPair};
pub use refresh_token::{
    generate_family, generate_jti, hash_refresh_token, PgRefreshLedger, RefreshLedger,
    RefreshTokenRecord,
};
pub use session::{resolve_session, Identity, SessionResult};
pub use user_store::{NewUser, PgUserStore, User, UserStore};
