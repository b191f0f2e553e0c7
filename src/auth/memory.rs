/// In-memory store implementations
///
/// Mutex-guarded implementations of the two store seams with the same
/// semantics as the Postgres versions, including the compare-and-swap
/// behavior of `rotate`. Used by the scenario tests; also serviceable for
/// single-process deployments where revocation state need not survive a
/// restart.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::auth::refresh_token::{RefreshLedger, RefreshTokenRecord};
use crate::auth::user_store::{NewUser, User, UserStore};
use crate::error::LedgerError;

#[derive(Default)]
pub struct InMemoryLedger {
    rows: Mutex<Vec<RefreshTokenRecord>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every row, for assertions on revocation state
    pub fn snapshot(&self) -> Vec<RefreshTokenRecord> {
        self.rows.lock().expect("ledger lock poisoned").clone()
    }
}

#[async_trait]
impl RefreshLedger for InMemoryLedger {
    async fn record(&self, record: RefreshTokenRecord) -> Result<(), LedgerError> {
        self.rows.lock().expect("ledger lock poisoned").push(record);
        Ok(())
    }

    async fn lookup_active(
        &self,
        token_hash: &str,
        family: Uuid,
    ) -> Result<Option<RefreshTokenRecord>, LedgerError> {
        let now = Utc::now();
        let rows = self.rows.lock().expect("ledger lock poisoned");
        Ok(rows
            .iter()
            .find(|r| r.token_hash == token_hash && r.family == family && r.is_active(now))
            .cloned())
    }

    async fn revoke(&self, id: Uuid) -> Result<(), LedgerError> {
        let mut rows = self.rows.lock().expect("ledger lock poisoned");
        if let Some(row) = rows.iter_mut().find(|r| r.id == id) {
            row.revoked = true;
        }
        Ok(())
    }

    async fn revoke_family(&self, family: Uuid) -> Result<(), LedgerError> {
        let mut rows = self.rows.lock().expect("ledger lock poisoned");
        for row in rows.iter_mut().filter(|r| r.family == family) {
            row.revoked = true;
        }
        Ok(())
    }

    async fn rotate(
        &self,
        token_hash: &str,
        family: Uuid,
        replacement: RefreshTokenRecord,
    ) -> Result<Option<RefreshTokenRecord>, LedgerError> {
        let now = Utc::now();
        // One critical section covers consume + insert, matching the
        // single-transaction guarantee of the Postgres ledger.
        let mut rows = self.rows.lock().expect("ledger lock poisoned");

        let consumed = match rows
            .iter_mut()
            .find(|r| r.token_hash == token_hash && r.family == family && r.is_active(now))
        {
            Some(row) => {
                row.revoked = true;
                row.clone()
            }
            None => return Ok(None),
        };

        rows.push(replacement);
        Ok(Some(consumed))
    }
}

#[derive(Default)]
pub struct InMemoryUserStore {
    users: Mutex<Vec<User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a user record, simulating account deletion
    pub fn remove(&self, id: Uuid) {
        self.users
            .lock()
            .expect("user store lock poisoned")
            .retain(|u| u.id != id);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, LedgerError> {
        let users = self.users.lock().expect("user store lock poisoned");
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, LedgerError> {
        let users = self.users.lock().expect("user store lock poisoned");
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, LedgerError> {
        let mut users = self.users.lock().expect("user store lock poisoned");

        if users.iter().any(|u| u.email == user.email) {
            return Err(LedgerError::Duplicate(format!(
                "email {} already registered",
                user.email
            )));
        }

        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            created_at: Utc::now(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn update_password_hash(
        &self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), LedgerError> {
        let mut users = self.users.lock().expect("user store lock poisoned");
        match users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.password_hash = Some(password_hash.to_string());
                Ok(())
            }
            None => Ok(()),
        }
    }
}
