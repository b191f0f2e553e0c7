/// Refresh Ledger
///
/// Persistent record of issued refresh tokens, grouped into families.
/// Records hold only a SHA-256 digest of the signed token (never the raw
/// token). Invariant: a family has at most one record with `revoked = false`
/// at any time; rotation revokes the consumed record in the same transaction
/// that inserts its successor.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::LedgerError;

/// One row of the ledger; mirrors the refresh token's signed claims
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub family: Uuid,
    pub revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn new(user_id: Uuid, family: Uuid, token_hash: String, expiry_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            token_hash,
            family,
            revoked: false,
            expires_at: now + Duration::seconds(expiry_seconds),
            created_at: now,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.revoked && self.expires_at > now
    }
}

/// Generate a fresh family id for a new login event
pub fn generate_family() -> Uuid {
    Uuid::new_v4()
}

/// Generate a fresh unique token identifier
pub fn generate_jti() -> Uuid {
    Uuid::new_v4()
}

/// Digest a raw refresh token for storage and lookup.
///
/// A fast hash is enough here: the input is a high-entropy signed token,
/// not a guessable password.
pub fn hash_refresh_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Storage seam for refresh token records
///
/// `rotate` is the critical operation: it must consume the active record and
/// insert its successor atomically, so that of two concurrent rotations on
/// the same record exactly one wins and the loser observes `None`.
#[async_trait]
pub trait RefreshLedger: Send + Sync {
    /// Persist a new active record
    async fn record(&self, record: RefreshTokenRecord) -> Result<(), LedgerError>;

    /// Return the record for this hash/family only if unrevoked and unexpired
    async fn lookup_active(
        &self,
        token_hash: &str,
        family: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, LedgerError>;

    /// Idempotently revoke a single record
    async fn revoke(&self, id: Uuid) -> Result<(), LedgerError>;

    /// Idempotently revoke every record in a family, whatever its state
    async fn revoke_family(&self, family: Uuid) -> Result<(), LedgerError>;

    /// Atomically revoke the active record matching (token_hash, family) and
    /// insert `replacement` in the same transaction. Returns the consumed
    /// record, or `None` when no active record matched, which is the
    /// caller's theft signal. On `None` nothing is inserted.
    async fn rotate(
        &self,
        token_hash: &str,
        family: Uuid,
        replacement: RefreshTokenRecord,
    ) -> Result<Option<RefreshTokenRecord>, LedgerError>;
}

/// Postgres-backed ledger
pub struct PgRefreshLedger {
    pool: PgPool,
}

impl PgRefreshLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshLedger for PgRefreshLedger {
    async fn record(&self, record: RefreshTokenRecord) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token_hash, family, revoked, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.token_hash)
        .bind(record.family)
        .bind(record.revoked)
        .bind(record.expires_at)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn lookup_active(
        &self,
        token_hash: &str,
        family: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, LedgerError> {
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            SELECT id, user_id, token_hash, family, revoked, expires_at, created_at
            FROM refresh_tokens
            WHERE token_hash = $1 AND family = $2 AND revoked = false AND expires_at > $3
            "#,
        )
        .bind(token_hash)
        .bind(family)
        .bind(Utc::now())
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn revoke(&self, id: Uuid) -> Result<(), LedgerError> {
        sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn revoke_family(&self, family: Uuid) -> Result<(), LedgerError> {
        sqlx::query("UPDATE refresh_tokens SET revoked = true WHERE family = $1")
            .bind(family)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn rotate(
        &self,
        token_hash: &str,
        family: Uuid,
        replacement: RefreshTokenRecord,
    ) -> Result<Option<RefreshTokenRecord>, LedgerError> {
        let mut tx = self.pool.begin().await?;

        // The guarded UPDATE is the compare-and-swap: of two racing
        // rotations, exactly one sees revoked = false here.
        let consumed = sqlx::query_as::<_, RefreshTokenRecord>(
            r#"
            UPDATE refresh_tokens
            SET revoked = true
            WHERE token_hash = $1 AND family = $2 AND revoked = false AND expires_at > $3
            RETURNING id, user_id, token_hash, family, revoked, expires_at, created_at
            "#,
        )
        .bind(token_hash)
        .bind(family)
        .bind(Utc::now())
        .fetch_optional(&mut tx)
        .await?;

        let consumed = match consumed {
            Some(record) => record,
            None => return Ok(None),
        };

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (id, user_id, token_hash, family, revoked, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(replacement.id)
        .bind(replacement.user_id)
        .bind(&replacement.token_hash)
        .bind(replacement.family)
        .bind(replacement.revoked)
        .bind(replacement.expires_at)
        .bind(replacement.created_at)
        .execute(&mut tx)
        .await?;

        tx.commit().await?;

        Ok(Some(consumed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_hashing_is_deterministic() {
        let token = "header.payload.signature";
        let hash1 = hash_refresh_token(token);
        let hash2 = hash_refresh_token(token);

        assert_eq!(hash1, hash2);
        assert_ne!(token, hash1);
        // SHA-256 hex
        assert_eq!(hash1.len(), 64);
    }

    #[test]
    fn test_different_tokens_different_hashes() {
        let hash1 = hash_refresh_token("token-one");
        let hash2 = hash_refresh_token("token-two");

        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_new_record_is_active() {
        let record =
            RefreshTokenRecord::new(Uuid::new_v4(), Uuid::new_v4(), "hash".to_string(), 3600);

        assert!(!record.revoked);
        assert!(record.is_active(Utc::now()));
    }

    #[test]
    fn test_expired_record_is_not_active() {
        let record =
            RefreshTokenRecord::new(Uuid::new_v4(), Uuid::new_v4(), "hash".to_string(), -3600);

        assert!(!record.is_active(Utc::now()));
    }

    #[test]
    fn test_family_and_jti_are_unique() {
        assert_ne!(generate_family(), generate_family());
        assert_ne!(generate_jti(), generate_jti());
    }
}
