//! Credential and session repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Expose stored password hashes for verification only.
//! - Persist opaque bearer tokens with their identity and expiry.
//!
//! # Invariants
//! - Tokens are never reused; a token row is deleted on logout or expiry.
//! - Password hashes never leave this module except as verification input.

use crate::model::participant::Role;
use crate::model::scope::Scope;
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Hash and role stored for one participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredentials {
    pub role: Role,
    pub password_hash: String,
}

/// Issued bearer token and the identity it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token: String,
    pub scope: Scope,
    pub name: String,
    pub role: Role,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds; the token is rejected from this instant on.
    pub expires_at: i64,
}

/// Repository interface for credential verification and sessions.
pub trait SessionRepository {
    /// Loads the stored hash for one participant.
    fn load_credentials(&self, scope: &Scope, name: &str)
        -> RepoResult<Option<StoredCredentials>>;
    /// Persists one newly issued token.
    fn create_session(&self, session: &SessionRecord) -> RepoResult<()>;
    /// Loads one token, expired or not.
    fn get_session(&self, token: &str) -> RepoResult<Option<SessionRecord>>;
    /// Deletes one token; returns whether a row existed.
    fn delete_session(&self, token: &str) -> RepoResult<bool>;
    /// Deletes every token expired at `now_ms`; returns removed row count.
    fn delete_expired_sessions(&self, now_ms: i64) -> RepoResult<usize>;
}

/// SQLite-backed session repository.
pub struct SqliteSessionRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteSessionRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl SessionRepository for SqliteSessionRepository<'_> {
    fn load_credentials(
        &self,
        scope: &Scope,
        name: &str,
    ) -> RepoResult<Option<StoredCredentials>> {
        let row = self
            .conn
            .query_row(
                "SELECT role, password_hash
                 FROM participants
                 WHERE scope = ?1
                   AND name = ?2;",
                params![scope.storage_key(), name],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        row.map(|(role_text, password_hash)| {
            let role = parse_role(&role_text, "participants.role")?;
            Ok(StoredCredentials {
                role,
                password_hash,
            })
        })
        .transpose()
    }

    fn create_session(&self, session: &SessionRecord) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO sessions (token, scope, name, role, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                session.token.as_str(),
                session.scope.storage_key(),
                session.name.as_str(),
                session.role.as_str(),
                session.created_at,
                session.expires_at,
            ],
        )?;
        Ok(())
    }

    fn get_session(&self, token: &str) -> RepoResult<Option<SessionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT token, scope, name, role, created_at, expires_at
             FROM sessions
             WHERE token = ?1;",
        )?;
        let mut rows = stmt.query([token])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_session_row(row)?));
        }
        Ok(None)
    }

    fn delete_session(&self, token: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM sessions WHERE token = ?1;", [token])?;
        Ok(changed > 0)
    }

    fn delete_expired_sessions(&self, now_ms: i64) -> RepoResult<usize> {
        let changed = self
            .conn
            .execute("DELETE FROM sessions WHERE expires_at <= ?1;", [now_ms])?;
        Ok(changed)
    }
}

fn parse_session_row(row: &Row<'_>) -> RepoResult<SessionRecord> {
    let scope_key: String = row.get("scope")?;
    let role_text: String = row.get("role")?;
    Ok(SessionRecord {
        token: row.get("token")?,
        scope: Scope::from_storage_key(&scope_key),
        name: row.get("name")?,
        role: parse_role(&role_text, "sessions.role")?,
        created_at: row.get("created_at")?,
        expires_at: row.get("expires_at")?,
    })
}

fn parse_role(value: &str, column: &'static str) -> RepoResult<Role> {
    Role::parse(value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid role `{value}` in {column}")))
}
