/// Rotation Protocol
///
/// The stateful algorithm tying hasher, codec, and ledger together for
/// login, refresh, and logout, including theft detection. A family moves
/// Active -> Rotated on each successful refresh and terminally Revoked on
/// logout or detected reuse.
///
/// Concurrency note: two refresh calls racing on the same still-active
/// record resolve through the ledger's atomic `rotate`; the loser takes the
/// same family-revocation path as a replayed token. A concurrent legitimate
/// refresh is deliberately indistinguishable from a replay, since a
/// legitimate client never redeems the same token twice in flight; both get
/// the same remedy instead of a last-writer-wins merge.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use uuid::Uuid;

use crate::auth::cookies::{auth_cookies, clear_auth_cookies, CookieSpec};
use crate::auth::jwt::TokenCodec;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::refresh_token::{
    generate_family, generate_jti, hash_refresh_token, RefreshLedger, RefreshTokenRecord,
};
use crate::auth::session::{resolve_session, SessionResult};
use crate::auth::user_store::{NewUser, User, UserStore};
use crate::configuration::AuthSettings;
use crate::error::{AppError, AuthError, LedgerError};
use crate::validators::is_valid_email;

/// The opaque credential pair handed to the transport layer
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

pub struct AuthService {
    codec: TokenCodec,
    users: Arc<dyn UserStore>,
    ledger: Arc<dyn RefreshLedger>,
    settings: AuthSettings,
    session_version: AtomicU64,
}

impl AuthService {
    pub fn new(
        settings: AuthSettings,
        users: Arc<dyn UserStore>,
        ledger: Arc<dyn RefreshLedger>,
    ) -> Self {
        Self {
            codec: TokenCodec::new(&settings),
            users,
            ledger,
            settings,
            session_version: AtomicU64::new(0),
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Register a new user and start their first session
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<TokenPair, AppError> {
        let email = is_valid_email(email)?;
        let password_hash = hash_password(password)?;

        let user = self
            .users
            .insert(NewUser {
                email,
                password_hash: Some(password_hash),
                first_name,
                last_name,
            })
            .await
            .map_err(|e| match e {
                LedgerError::Duplicate(_) => AppError::Auth(AuthError::EmailTaken),
                other => AppError::Ledger(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");

        self.start_session(&user).await
    }

    /// Authenticate with email and password.
    ///
    /// Unknown email, an account without a password hash (externally
    /// authenticated), and a wrong password all collapse to the same
    /// rejection, preventing user enumeration.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AppError> {
        let email = is_valid_email(email)?;

        let user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

        let stored_hash = user
            .password_hash
            .as_deref()
            .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

        if !verify_password(password, stored_hash) {
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }

        tracing::info!(user_id = %user.id, "User logged in");

        self.start_session(&user).await
    }

    /// Token-issuance primitive: mint a pair under a fresh family and record
    /// it in the ledger.
    ///
    /// Also the entry point for an external identity provider pre-step,
    /// which authenticates the user by other means and then calls here.
    pub async fn start_session(&self, user: &User) -> Result<TokenPair, AppError> {
        let family = generate_family();
        let jti = generate_jti();

        let access_token =
            self.codec
                .sign_access(user.id, &user.email, self.next_session_version())?;
        let refresh_token = self.codec.sign_refresh(user.id, family, jti)?;

        let record = RefreshTokenRecord::new(
            user.id,
            family,
            hash_refresh_token(&refresh_token),
            self.settings.refresh_token_expiry,
        );
        self.ledger.record(record).await?;

        tracing::debug!(user_id = %user.id, family = %family, "Session started");

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Redeem a refresh token for a new pair, retiring the old record.
    ///
    /// A refresh token is redeemable exactly once. A token whose signature
    /// verifies but which matches no active ledger record has either been
    /// rotated away already (replay) or the ledger never issued it: the
    /// whole family is revoked, bounding a stolen token to at most one
    /// extra use.
    pub async fn refresh(&self, raw_refresh: &str) -> Result<TokenPair, AppError> {
        // Cryptographic failure rejects outright with no ledger access, so
        // probing with garbage tokens reveals nothing about live families.
        let claims = match self.codec.verify_refresh(raw_refresh) {
            Ok(claims) => claims,
            Err(e) => {
                let err = AppError::Auth(e);
                err.log("refresh");
                return Err(err);
            }
        };

        let user_id = claims.user_id().map_err(AppError::Auth)?;
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::Auth(AuthError::AccountNotFound))?;

        // Mint the successor before the swap; if the rotation loses a race
        // nothing minted here is persisted or returned.
        let jti = generate_jti();
        let access_token =
            self.codec
                .sign_access(user.id, &user.email, self.next_session_version())?;
        let refresh_token = self.codec.sign_refresh(user.id, claims.family, jti)?;
        let replacement = RefreshTokenRecord::new(
            user.id,
            claims.family,
            hash_refresh_token(&refresh_token),
            self.settings.refresh_token_expiry,
        );

        let presented_hash = hash_refresh_token(raw_refresh);
        match self
            .ledger
            .rotate(&presented_hash, claims.family, replacement)
            .await?
        {
            Some(consumed) => {
                tracing::debug!(
                    user_id = %user.id,
                    family = %claims.family,
                    retired = %consumed.id,
                    "Refresh token rotated"
                );
                Ok(TokenPair {
                    access_token,
                    refresh_token,
                })
            }
            None => {
                self.ledger.revoke_family(claims.family).await?;
                let err = AppError::Auth(AuthError::TokenReused);
                err.log("refresh");
                Err(err)
            }
        }
    }

    /// Revoke the presented token's whole family.
    ///
    /// The signature must verify but expiry is not checked: a logout with
    /// an expired-but-authentic token still cleans up the ledger. The
    /// transport clears cookies regardless of this call's outcome.
    pub async fn logout(&self, raw_refresh: &str) -> Result<(), AppError> {
        let claims = self
            .codec
            .verify_refresh_ignoring_expiry(raw_refresh)
            .map_err(AppError::Auth)?;

        self.ledger.revoke_family(claims.family).await?;

        tracing::info!(family = %claims.family, "Family revoked on logout");
        Ok(())
    }

    /// Resolve an access token to an identity or Anonymous
    pub async fn session(&self, raw_access: &str) -> SessionResult {
        resolve_session(&self.codec, self.users.as_ref(), raw_access).await
    }

    /// Replace a user's password after verifying the current one
    pub async fn change_password(
        &self,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AppError::Auth(AuthError::AccountNotFound))?;

        let stored_hash = user
            .password_hash
            .as_deref()
            .ok_or(AppError::Auth(AuthError::InvalidCredentials))?;

        if !verify_password(current_password, stored_hash) {
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }

        let new_hash = hash_password(new_password)?;
        self.users.update_password_hash(user.id, &new_hash).await?;

        tracing::info!(user_id = %user.id, "Password updated");
        Ok(())
    }

    /// Cookie pair for a freshly issued token pair
    pub fn issue_cookies(&self, pair: &TokenPair) -> [CookieSpec; 2] {
        auth_cookies(pair, &self.settings)
    }

    /// Cleared cookie pair, applied on logout and failed refresh
    pub fn clear_cookies(&self) -> [CookieSpec; 2] {
        clear_auth_cookies(&self.settings)
    }

    /// Issuance counter for access claims: seeded from wall-clock millis
    /// but strictly increasing, so rapid re-issuance within one millisecond
    /// cannot collide.
    fn next_session_version(&self) -> u64 {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let mut prev = self.session_version.load(Ordering::Relaxed);
        loop {
            let next = now.max(prev + 1);
            match self.session_version.compare_exchange_weak(
                prev,
                next,
                Ordering::SeqCst,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(observed) => prev = observed,
            }
        }
    }
}
