/// Token Codec
///
/// Signs and verifies the two token kinds as compact HS256 JWTs. Access and
/// refresh tokens use independent secrets, so a leaked access-signing key
/// cannot mint refresh tokens. Keys come from an explicit settings struct,
/// never from globals, which keeps per-test isolation cheap.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::{AccessClaims, RefreshClaims, TokenType};
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError};

pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
}

impl TokenCodec {
    pub fn new(settings: &AuthSettings) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(settings.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(settings.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(settings.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(settings.refresh_secret.as_bytes()),
            access_token_expiry: settings.access_token_expiry,
            refresh_token_expiry: settings.refresh_token_expiry,
        }
    }

    pub fn access_token_expiry(&self) -> i64 {
        self.access_token_expiry
    }

    pub fn refresh_token_expiry(&self) -> i64 {
        self.refresh_token_expiry
    }

    /// Mint a signed access token
    pub fn sign_access(
        &self,
        user_id: Uuid,
        email: &str,
        session_version: u64,
    ) -> Result<String, AppError> {
        let claims = AccessClaims::new(
            user_id,
            email.to_string(),
            session_version,
            self.access_token_expiry,
        );

        encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))
    }

    /// Mint a signed refresh token carrying its family and jti
    pub fn sign_refresh(
        &self,
        user_id: Uuid,
        family: Uuid,
        jti: Uuid,
    ) -> Result<String, AppError> {
        let claims = RefreshClaims::new(user_id, family, jti, self.refresh_token_expiry);

        encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))
    }

    /// Validate an access token and extract its claims
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let data = decode::<AccessClaims>(token, &self.access_decoding, &validation(true))
            .map_err(map_jwt_error)?;

        if data.claims.token_type != TokenType::Access {
            return Err(AuthError::WrongTokenType);
        }

        Ok(data.claims)
    }

    /// Validate a refresh token and extract its claims
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        let data = decode::<RefreshClaims>(token, &self.refresh_decoding, &validation(true))
            .map_err(map_jwt_error)?;

        if data.claims.token_type != TokenType::Refresh {
            return Err(AuthError::WrongTokenType);
        }

        Ok(data.claims)
    }

    /// Validate a refresh token's signature without checking expiry.
    ///
    /// Logout honors an expired-but-authentic token so the ledger still gets
    /// cleaned up.
    pub fn verify_refresh_ignoring_expiry(&self, token: &str) -> Result<RefreshClaims, AuthError> {
        let data = decode::<RefreshClaims>(token, &self.refresh_decoding, &validation(false))
            .map_err(map_jwt_error)?;

        if data.claims.token_type != TokenType::Refresh {
            return Err(AuthError::WrongTokenType);
        }

        Ok(data.claims)
    }
}

fn validation(check_expiry: bool) -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    // No leeway: a token is invalid at its expiry instant
    validation.leeway = 0;
    validation.validate_exp = check_expiry;
    validation
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        _ => AuthError::TokenMalformed,
    }
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
            secure_cookies: false,
        }
    }

    #[test]
    fn test_sign_and_verify_access_token() {
        let codec = TokenCodec::new(&get_test_settings());
        let user_id = Uuid::new_v4();

        let token = codec
            .sign_access(user_id, "test@example.com", 42)
            .expect("Failed to sign token");
        let claims = codec.verify_access(&token).expect("Failed to verify token");

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.session_version, 42);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn test_sign_and_verify_refresh_token() {
        let codec = TokenCodec::new(&get_test_settings());
        let user_id = Uuid::new_v4();
        let family = Uuid::new_v4();
        let jti = Uuid::new_v4();

        let token = codec
            .sign_refresh(user_id, family, jti)
            .expect("Failed to sign token");
        let claims = codec.verify_refresh(&token).expect("Failed to verify token");

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.family, family);
        assert_eq!(claims.jti, jti);
    }

    #[test]
    fn test_garbage_token_is_malformed() {
        let codec = TokenCodec::new(&get_test_settings());
        assert_eq!(
            codec.verify_access("invalid.token.here"),
            Err(AuthError::TokenMalformed)
        );
    }

    #[test]
    fn test_tampered_token_rejected() {
        let codec = TokenCodec::new(&get_test_settings());
        let token = codec
            .sign_access(Uuid::new_v4(), "test@example.com", 1)
            .expect("Failed to sign token");

        let tampered = format!("{}X", token);
        assert!(codec.verify_access(&tampered).is_err());
    }

    #[test]
    fn test_cross_kind_use_rejected() {
        let codec = TokenCodec::new(&get_test_settings());
        let user_id = Uuid::new_v4();

        let access = codec
            .sign_access(user_id, "test@example.com", 1)
            .expect("Failed to sign token");
        let refresh = codec
            .sign_refresh(user_id, Uuid::new_v4(), Uuid::new_v4())
            .expect("Failed to sign token");

        // Independent secrets: the signature check already refuses the swap
        assert_eq!(
            codec.verify_refresh(&access),
            Err(AuthError::InvalidSignature)
        );
        assert_eq!(
            codec.verify_access(&refresh),
            Err(AuthError::InvalidSignature)
        );
    }

    #[test]
    fn test_type_claim_mismatch_rejected() {
        let codec = TokenCodec::new(&get_test_settings());

        // Access-shaped claims carrying the wrong type, signed with the
        // access secret: signature holds, the type check must refuse it.
        let mut claims = AccessClaims::new(Uuid::new_v4(), "test@example.com".to_string(), 1, 900);
        claims.token_type = TokenType::Refresh;

        let settings = get_test_settings();
        let forged = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(settings.access_secret.as_bytes()),
        )
        .expect("Failed to sign token");

        assert_eq!(
            codec.verify_access(&forged),
            Err(AuthError::WrongTokenType)
        );
    }

    #[test]
    fn test_expired_access_token() {
        let mut settings = get_test_settings();
        settings.access_token_expiry = -60;
        let codec = TokenCodec::new(&settings);

        let token = codec
            .sign_access(Uuid::new_v4(), "test@example.com", 1)
            .expect("Failed to sign token");

        assert_eq!(codec.verify_access(&token), Err(AuthError::TokenExpired));
    }

    #[test]
    fn test_expired_refresh_token_verifies_when_expiry_ignored() {
        let mut settings = get_test_settings();
        settings.refresh_token_expiry = -60;
        let codec = TokenCodec::new(&settings);

        let user_id = Uuid::new_v4();
        let family = Uuid::new_v4();
        let token = codec
            .sign_refresh(user_id, family, Uuid::new_v4())
            .expect("Failed to sign token");

        assert_eq!(codec.verify_refresh(&token), Err(AuthError::TokenExpired));

        let claims = codec
            .verify_refresh_ignoring_expiry(&token)
            .expect("Signature should still verify");
        assert_eq!(claims.family, family);
    }

    #[test]
    fn test_distinct_codecs_do_not_cross_verify() {
        let codec_a = TokenCodec::new(&get_test_settings());

        let mut other = get_test_settings();
        other.access_secret = "another-access-secret-32-characters-min".to_string();
        let codec_b = TokenCodec::new(&other);

        let token = codec_a
            .sign_access(Uuid::new_v4(), "test@example.com", 1)
            .expect("Failed to sign token");

        assert_eq!(
            codec_b.verify_access(&token),
            Err(AuthError::InvalidSignature)
        );
    }
}
