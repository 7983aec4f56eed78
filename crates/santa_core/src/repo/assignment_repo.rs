//! Assignment repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the giver/receiver set and generation flag of each scope.
//! - Own the all-or-nothing replace and reset transactions.
//!
//! # Invariants
//! - `replace_assignments` deletes prior rows, inserts the new set and raises
//!   the flag in one IMMEDIATE transaction.
//! - `reset_scope` clears assignments, member participants, their sessions
//!   and the flag in one IMMEDIATE transaction; admins survive.
//! - A scope without a `generation_state` row reads as not generated.

use crate::model::assignment::{Assignment, GenerationStatus};
use crate::model::participant::Role;
use crate::model::scope::Scope;
use crate::repo::{ensure_connection_ready, now_epoch_ms, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

/// Rows removed by one reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetSummary {
    pub assignments_removed: usize,
    pub participants_removed: usize,
}

/// Repository interface for draw state operations.
pub trait AssignmentRepository {
    /// Names of members eligible for the draw, sorted by name.
    fn list_draw_pool(&self, scope: &Scope) -> RepoResult<Vec<String>>;
    /// Atomically replaces the whole assignment set and raises the flag.
    ///
    /// Fails with `Conflict` when the givers no longer match the draw pool.
    fn replace_assignments(
        &mut self,
        scope: &Scope,
        assignments: &[Assignment],
    ) -> RepoResult<GenerationStatus>;
    /// Receiver drawn by `giver`, if a row exists.
    fn get_receiver(&self, scope: &Scope, giver: &str) -> RepoResult<Option<String>>;
    /// Current flag and row count.
    fn generation_status(&self, scope: &Scope) -> RepoResult<GenerationStatus>;
    /// All pairs of the scope ordered by giver.
    fn list_assignments(&self, scope: &Scope) -> RepoResult<Vec<Assignment>>;
    /// Atomically clears the scope's draw state and member participants.
    fn reset_scope(&mut self, scope: &Scope) -> RepoResult<ResetSummary>;
}

/// SQLite-backed assignment repository.
pub struct SqliteAssignmentRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteAssignmentRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl AssignmentRepository for SqliteAssignmentRepository<'_> {
    fn list_draw_pool(&self, scope: &Scope) -> RepoResult<Vec<String>> {
        load_member_names(self.conn, scope)
    }

    fn replace_assignments(
        &mut self,
        scope: &Scope,
        assignments: &[Assignment],
    ) -> RepoResult<GenerationStatus> {
        let scope_key = scope.storage_key();
        let generated_at = now_epoch_ms();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        ensure_givers_match_pool(&tx, scope, assignments)?;

        tx.execute("DELETE FROM assignments WHERE scope = ?1;", [scope_key])?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO assignments (scope, giver, receiver)
                 VALUES (?1, ?2, ?3);",
            )?;
            for assignment in assignments {
                insert.execute(params![
                    scope_key,
                    assignment.giver.as_str(),
                    assignment.receiver.as_str()
                ])?;
            }
        }
        tx.execute(
            "INSERT INTO generation_state (scope, generated, generated_at)
             VALUES (?1, 1, ?2)
             ON CONFLICT (scope) DO UPDATE SET
                generated = 1,
                generated_at = excluded.generated_at;",
            params![scope_key, generated_at],
        )?;
        tx.commit()?;

        Ok(GenerationStatus {
            generated: true,
            generated_at: Some(generated_at),
            assignment_count: count_to_u32(assignments.len())?,
        })
    }

    fn get_receiver(&self, scope: &Scope, giver: &str) -> RepoResult<Option<String>> {
        let receiver = self
            .conn
            .query_row(
                "SELECT receiver
                 FROM assignments
                 WHERE scope = ?1
                   AND giver = ?2;",
                params![scope.storage_key(), giver],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(receiver)
    }

    fn generation_status(&self, scope: &Scope) -> RepoResult<GenerationStatus> {
        let scope_key = scope.storage_key();
        let flag = self
            .conn
            .query_row(
                "SELECT generated, generated_at
                 FROM generation_state
                 WHERE scope = ?1;",
                [scope_key],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, Option<i64>>(1)?)),
            )
            .optional()?;
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM assignments WHERE scope = ?1;",
            [scope_key],
            |row| row.get(0),
        )?;
        let assignment_count = u32::try_from(count).map_err(|_| {
            RepoError::InvalidData(format!("assignment count `{count}` out of range"))
        })?;

        let (generated, generated_at) = match flag {
            None => (false, None),
            Some((0, at)) => (false, at),
            Some((1, at)) => (true, at),
            Some((other, _)) => {
                return Err(RepoError::InvalidData(format!(
                    "invalid generated value `{other}` in generation_state.generated"
                )));
            }
        };

        Ok(GenerationStatus {
            generated,
            generated_at,
            assignment_count,
        })
    }

    fn list_assignments(&self, scope: &Scope) -> RepoResult<Vec<Assignment>> {
        let mut stmt = self.conn.prepare(
            "SELECT giver, receiver
             FROM assignments
             WHERE scope = ?1
             ORDER BY giver ASC;",
        )?;
        let mut rows = stmt.query([scope.storage_key()])?;
        let mut assignments = Vec::new();
        while let Some(row) = rows.next()? {
            assignments.push(Assignment {
                giver: row.get("giver")?,
                receiver: row.get("receiver")?,
            });
        }
        Ok(assignments)
    }

    fn reset_scope(&mut self, scope: &Scope) -> RepoResult<ResetSummary> {
        let scope_key = scope.storage_key();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let assignments_removed =
            tx.execute("DELETE FROM assignments WHERE scope = ?1;", [scope_key])?;
        tx.execute(
            "DELETE FROM sessions WHERE scope = ?1 AND role = ?2;",
            params![scope_key, Role::Member.as_str()],
        )?;
        let participants_removed = tx.execute(
            "DELETE FROM participants WHERE scope = ?1 AND role = ?2;",
            params![scope_key, Role::Member.as_str()],
        )?;
        tx.execute(
            "DELETE FROM generation_state WHERE scope = ?1;",
            [scope_key],
        )?;
        tx.commit()?;

        Ok(ResetSummary {
            assignments_removed,
            participants_removed,
        })
    }
}

fn load_member_names(conn: &Connection, scope: &Scope) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name
         FROM participants
         WHERE scope = ?1
           AND role = ?2
         ORDER BY name ASC;",
    )?;
    let mut rows = stmt.query(params![scope.storage_key(), Role::Member.as_str()])?;
    let mut names = Vec::new();
    while let Some(row) = rows.next()? {
        names.push(row.get(0)?);
    }
    Ok(names)
}

fn ensure_givers_match_pool(
    tx: &Transaction<'_>,
    scope: &Scope,
    assignments: &[Assignment],
) -> RepoResult<()> {
    let pool = load_member_names(tx, scope)?;
    let mut givers: Vec<&str> = assignments.iter().map(|a| a.giver.as_str()).collect();
    givers.sort_unstable();

    if givers.len() != pool.len() || givers.iter().zip(&pool).any(|(g, p)| *g != p.as_str()) {
        return Err(RepoError::Conflict(format!(
            "participants of {scope} changed during generation"
        )));
    }
    Ok(())
}

fn count_to_u32(count: usize) -> RepoResult<u32> {
    u32::try_from(count)
        .map_err(|_| RepoError::InvalidData(format!("assignment count `{count}` out of range")))
}
