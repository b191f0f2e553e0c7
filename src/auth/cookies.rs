/// Cookie contract
///
/// Transport-agnostic description of the two auth cookies. The HTTP
/// collaborator serializes these into Set-Cookie headers; the core never
/// touches request or response objects.

use crate::auth::protocol::TokenPair;
use crate::configuration::AuthSettings;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    Strict,
    None,
}

/// One cookie the transport should set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSpec {
    pub name: &'static str,
    pub value: String,
    /// Seconds; 0 clears the cookie
    pub max_age: i64,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: SameSite,
    pub path: &'static str,
}

impl CookieSpec {
    fn auth(name: &'static str, value: String, max_age: i64, secure: bool) -> Self {
        Self {
            name,
            value,
            max_age,
            http_only: true,
            secure,
            same_site: SameSite::Lax,
            path: "/",
        }
    }
}

/// Cookie pair for a freshly issued token pair, max-ages matching each
/// token's lifetime
pub fn auth_cookies(pair: &TokenPair, settings: &AuthSettings) -> [CookieSpec; 2] {
    [
        CookieSpec::auth(
            ACCESS_COOKIE,
            pair.access_token.clone(),
            settings.access_token_expiry,
            settings.secure_cookies,
        ),
        CookieSpec::auth(
            REFRESH_COOKIE,
            pair.refresh_token.clone(),
            settings.refresh_token_expiry,
            settings.secure_cookies,
        ),
    ]
}

/// Cleared cookie pair.
///
/// Applied unconditionally on logout and on failed refresh, so the client
/// loses its credentials even when the ledger is unreachable.
pub fn clear_auth_cookies(settings: &AuthSettings) -> [CookieSpec; 2] {
    [
        CookieSpec::auth(ACCESS_COOKIE, String::new(), 0, settings.secure_cookies),
        CookieSpec::auth(REFRESH_COOKIE, String::new(), 0, settings.secure_cookies),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_test_settings() -> AuthSettings {
        AuthSettings {
            access_secret: "access-test-secret-at-least-32-characters".to_string(),
            refresh_secret: "refresh-test-secret-at-least-32-characters".to_string(),
            access_token_expiry: 900,
            refresh_token_expiry: 2_592_000,
            secure_cookies: true,
        }
    }

    #[test]
    fn test_auth_cookie_attributes() {
        let settings = get_test_settings();
        let pair = TokenPair {
            access_token: "aaa".to_string(),
            refresh_token: "rrr".to_string(),
        };

        let [access, refresh] = auth_cookies(&pair, &settings);

        assert_eq!(access.name, ACCESS_COOKIE);
        assert_eq!(access.value, "aaa");
        assert_eq!(access.max_age, 900);
        assert!(access.http_only);
        assert!(access.secure);
        assert_eq!(access.same_site, SameSite::Lax);
        assert_eq!(access.path, "/");

        assert_eq!(refresh.name, REFRESH_COOKIE);
        assert_eq!(refresh.max_age, 2_592_000);
    }

    #[test]
    fn test_clear_cookies_expire_immediately() {
        let settings = get_test_settings();
        let [access, refresh] = clear_auth_cookies(&settings);

        assert!(access.value.is_empty());
        assert_eq!(access.max_age, 0);
        assert!(refresh.value.is_empty());
        assert_eq!(refresh.max_age, 0);
    }
}
