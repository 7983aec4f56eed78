//! Participant repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist registered participants per scope.
//! - Own cascading removal of one participant's assignments and sessions.
//!
//! # Invariants
//! - `(scope, name)` is unique; violations surface as `RepoError::Duplicate`.
//! - Listing is deterministic: `name ASC`.
//! - Deleting a participant removes assignment rows where it is giver or
//!   receiver in the same transaction.

use crate::db::DbError;
use crate::model::participant::{Participant, Role};
use crate::model::scope::Scope;
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use log::info;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

const PARTICIPANT_SELECT_SQL: &str = "SELECT
    scope,
    name,
    role,
    created_at
FROM participants";

/// Repository interface for participant operations.
pub trait ParticipantRepository {
    /// Inserts one participant; duplicate names in the scope are rejected.
    fn create_participant(
        &self,
        scope: &Scope,
        name: &str,
        password_hash: &str,
        role: Role,
    ) -> RepoResult<Participant>;
    /// Creates or refreshes a global-scope admin account.
    fn upsert_admin(&self, name: &str, password_hash: &str) -> RepoResult<()>;
    /// Loads one participant by name.
    fn get_participant(&self, scope: &Scope, name: &str) -> RepoResult<Option<Participant>>;
    /// Lists participants of a scope, optionally filtered by role.
    fn list_participants(&self, scope: &Scope, role: Option<Role>)
        -> RepoResult<Vec<Participant>>;
    /// Deletes one participant together with its assignments and sessions.
    fn delete_participant(&mut self, scope: &Scope, name: &str) -> RepoResult<()>;
}

/// SQLite-backed participant repository.
pub struct SqliteParticipantRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteParticipantRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ParticipantRepository for SqliteParticipantRepository<'_> {
    fn create_participant(
        &self,
        scope: &Scope,
        name: &str,
        password_hash: &str,
        role: Role,
    ) -> RepoResult<Participant> {
        let inserted = self.conn.execute(
            "INSERT INTO participants (scope, name, password_hash, role)
             VALUES (?1, ?2, ?3, ?4);",
            params![scope.storage_key(), name, password_hash, role.as_str()],
        );

        if let Err(err) = inserted {
            let err = DbError::from(err);
            if err.is_unique_violation() {
                return Err(RepoError::Duplicate(format!(
                    "participant `{name}` in {scope}"
                )));
            }
            return Err(err.into());
        }

        self.get_participant(scope, name)?.ok_or_else(|| {
            RepoError::InvalidData(format!("participant `{name}` missing after insert"))
        })
    }

    fn upsert_admin(&self, name: &str, password_hash: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO participants (scope, name, password_hash, role)
             VALUES (?1, ?2, ?3, 'admin')
             ON CONFLICT (scope, name) DO UPDATE SET
                password_hash = excluded.password_hash,
                role = 'admin';",
            params![Scope::Global.storage_key(), name, password_hash],
        )?;
        Ok(())
    }

    fn get_participant(&self, scope: &Scope, name: &str) -> RepoResult<Option<Participant>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PARTICIPANT_SELECT_SQL}
             WHERE scope = ?1
               AND name = ?2;"
        ))?;
        let mut rows = stmt.query(params![scope.storage_key(), name])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_participant_row(row)?));
        }
        Ok(None)
    }

    fn list_participants(
        &self,
        scope: &Scope,
        role: Option<Role>,
    ) -> RepoResult<Vec<Participant>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PARTICIPANT_SELECT_SQL}
             WHERE scope = ?1
               AND (?2 IS NULL OR role = ?2)
             ORDER BY name ASC;"
        ))?;
        let mut rows = stmt.query(params![scope.storage_key(), role.map(Role::as_str)])?;
        let mut participants = Vec::new();
        while let Some(row) = rows.next()? {
            participants.push(parse_participant_row(row)?);
        }
        Ok(participants)
    }

    fn delete_participant(&mut self, scope: &Scope, name: &str) -> RepoResult<()> {
        let scope_key = scope.storage_key();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM participants WHERE scope = ?1 AND name = ?2;",
                params![scope_key, name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .is_some();
        if !exists {
            return Err(RepoError::NotFound(format!(
                "participant `{name}` in {scope}"
            )));
        }

        let assignments_removed = tx.execute(
            "DELETE FROM assignments
             WHERE scope = ?1
               AND (giver = ?2 OR receiver = ?2);",
            params![scope_key, name],
        )?;
        tx.execute(
            "DELETE FROM sessions WHERE scope = ?1 AND name = ?2;",
            params![scope_key, name],
        )?;
        tx.execute(
            "DELETE FROM participants WHERE scope = ?1 AND name = ?2;",
            params![scope_key, name],
        )?;
        tx.commit()?;

        info!(
            "event=participant_delete module=repo status=ok scope={} assignments_removed={}",
            scope, assignments_removed
        );
        Ok(())
    }
}

fn parse_participant_row(row: &Row<'_>) -> RepoResult<Participant> {
    let role_text: String = row.get("role")?;
    let role = Role::parse(&role_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid role `{role_text}` in participants.role"))
    })?;
    let scope_key: String = row.get("scope")?;

    Ok(Participant {
        name: row.get("name")?,
        scope: Scope::from_storage_key(&scope_key),
        role,
        created_at: row.get("created_at")?,
    })
}
