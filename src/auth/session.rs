/// Session Resolver
///
/// Turns an inbound access token into an authenticated identity or
/// `Anonymous`. Failure to authenticate is a normal outcome represented as a
/// value; this path never surfaces an error to the caller. The transport
/// layer extracts the raw token (cookie, header) and passes it in, keeping
/// this core transport-agnostic.

use crate::auth::jwt::TokenCodec;
use crate::auth::user_store::UserStore;
use crate::error::AuthError;

/// The authenticated identity handed to collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: uuid::Uuid,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionResult {
    Authenticated(Identity),
    Anonymous,
}

impl SessionResult {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionResult::Authenticated(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionResult::Authenticated(identity) => Some(identity),
            SessionResult::Anonymous => None,
        }
    }
}

/// Resolve a raw access token to an identity.
///
/// The user lookup confirms the account still exists: a deleted account
/// invalidates outstanding access tokens even before they expire, bounded
/// by the access-token lifetime.
pub async fn resolve_session(
    codec: &TokenCodec,
    users: &dyn UserStore,
    raw_token: &str,
) -> SessionResult {
    let claims = match codec.verify_access(raw_token) {
        Ok(claims) => claims,
        Err(AuthError::TokenExpired) => {
            tracing::debug!("Expired access token presented");
            return SessionResult::Anonymous;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Access token verification failed");
            return SessionResult::Anonymous;
        }
    };

    let user_id = match claims.user_id() {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!(error = %e, "Access token carried an unparseable subject");
            return SessionResult::Anonymous;
        }
    };

    match users.find_by_id(user_id).await {
        Ok(Some(user)) => SessionResult::Authenticated(Identity {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
        }),
        Ok(None) => {
            tracing::debug!(user_id = %user_id, "Valid token for a deleted account");
            SessionResult::Anonymous
        }
        Err(e) => {
            tracing::warn!(error = %e, "User lookup failed during session resolution");
            SessionResult::Anonymous
        }
    }
}
