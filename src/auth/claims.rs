/// Token Claims structures
///
/// Payloads of the two signed token kinds. Both carry an explicit `type`
/// claim so verification can reject cross-use of access tokens as refresh
/// tokens or vice versa.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthError;

/// Discriminates the two token kinds inside the signed payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// Claims for short-lived access tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// User email
    pub email: String,
    /// Issuance counter, a coarse invalidation nonce
    pub session_version: u64,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl AccessClaims {
    pub fn new(user_id: Uuid, email: String, session_version: u64, expiry_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            email,
            session_version,
            token_type: TokenType::Access,
            iat: now,
            exp: now + expiry_seconds,
        }
    }

    /// Extract user ID from claims
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::TokenMalformed)
    }

    /// A token is expired at its expiry instant, not one second after
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp <= now
    }
}

/// Claims for long-lived refresh tokens, mirrored by the ledger record
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RefreshClaims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Lineage shared by every token descended from one login event
    pub family: Uuid,
    /// Unique token identifier
    pub jti: Uuid,
    #[serde(rename = "type")]
    pub token_type: TokenType,
    pub iat: i64,
    pub exp: i64,
}

impl RefreshClaims {
    pub fn new(user_id: Uuid, family: Uuid, jti: Uuid, expiry_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            family,
            jti,
            token_type: TokenType::Refresh,
            iat: now,
            exp: now + expiry_seconds,
        }
    }

    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::TokenMalformed)
    }

    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_claims_creation() {
        let user_id = Uuid::new_v4();
        let email = "test@example.com".to_string();
        let claims = AccessClaims::new(user_id, email.clone(), 7, 900);

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, email);
        assert_eq!(claims.session_version, 7);
        assert_eq!(claims.token_type, TokenType::Access);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_refresh_claims_creation() {
        let user_id = Uuid::new_v4();
        let family = Uuid::new_v4();
        let jti = Uuid::new_v4();
        let claims = RefreshClaims::new(user_id, family, jti, 2_592_000);

        assert_eq!(claims.family, family);
        assert_eq!(claims.jti, jti);
        assert_eq!(claims.token_type, TokenType::Refresh);
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_user_id_extraction() {
        let user_id = Uuid::new_v4();
        let claims = AccessClaims::new(user_id, "test@example.com".to_string(), 1, 900);

        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn test_invalid_user_id() {
        let mut claims = AccessClaims::new(Uuid::new_v4(), "test@example.com".to_string(), 1, 900);
        claims.sub = "invalid-uuid".to_string();

        assert!(claims.user_id().is_err());
    }

    #[test]
    fn test_expiry_boundary() {
        let mut claims = AccessClaims::new(Uuid::new_v4(), "test@example.com".to_string(), 1, 900);

        // Exactly at the expiry instant counts as expired
        claims.exp = chrono::Utc::now().timestamp();
        assert!(claims.is_expired());

        claims.exp = chrono::Utc::now().timestamp() - 1;
        assert!(claims.is_expired());

        claims.exp = chrono::Utc::now().timestamp() + 60;
        assert!(!claims.is_expired());
    }

    #[test]
    fn test_token_type_serialization() {
        let json = serde_json::to_string(&TokenType::Access).unwrap();
        assert_eq!(json, r#""access""#);
        let json = serde_json::to_string(&TokenType::Refresh).unwrap();
        assert_eq!(json, r#""refresh""#);
    }
}
