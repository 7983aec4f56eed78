//! Assignment use-case service: generate, look up, report and reset draws.
//!
//! # Invariants
//! - Generation needs at least two members in the scope.
//! - A lookup succeeds only while the scope's generation flag is raised.
//! - A flagged scope without a row for the giver is reported as `NotFound`,
//!   never as `NotReady`.

use crate::derangement::{derange, DerangementError, Strategy};
use crate::model::assignment::{Assignment, GenerationStatus};
use crate::model::scope::Scope;
use crate::repo::assignment_repo::{AssignmentRepository, ResetSummary};
use crate::repo::RepoError;
use log::{info, warn};
use rand::Rng;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Errors from draw operations.
#[derive(Debug)]
pub enum AssignmentError {
    /// Fewer than two members in the scope.
    InsufficientParticipants { found: usize },
    /// Generation has not run (or was reset) for the scope.
    NotReady,
    /// Flag is raised but the giver has no row.
    NotFound(String),
    /// Shuffle budget exhausted; retrying may succeed.
    DerangementFailed { attempts: u32 },
    /// Members changed while the draw was being committed.
    ParticipantsChanged,
    /// Persistence-layer failure; the transaction was rolled back.
    Store(RepoError),
}

impl Display for AssignmentError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientParticipants { found } => write!(
                f,
                "at least 2 participants are required to generate assignments, found {found}"
            ),
            Self::NotReady => write!(f, "assignments have not been generated yet"),
            Self::NotFound(giver) => write!(f, "no assignment found for `{giver}`"),
            Self::DerangementFailed { attempts } => write!(
                f,
                "could not find a valid assignment after {attempts} attempts; try again"
            ),
            Self::ParticipantsChanged => {
                write!(f, "participants changed during generation; try again")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AssignmentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AssignmentError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Conflict(_) => Self::ParticipantsChanged,
            other => Self::Store(other),
        }
    }
}

impl From<DerangementError> for AssignmentError {
    fn from(value: DerangementError) -> Self {
        match value {
            DerangementError::TooFewParticipants(found) => {
                Self::InsufficientParticipants { found }
            }
            DerangementError::Exhausted { attempts } => Self::DerangementFailed { attempts },
            DerangementError::DuplicateName(name) => Self::Store(RepoError::InvalidData(format!(
                "duplicate participant `{name}` in draw pool"
            ))),
        }
    }
}

/// Draw service facade over repository implementations.
pub struct AssignmentService<R: AssignmentRepository> {
    repo: R,
    strategy: Strategy,
}

impl<R: AssignmentRepository> AssignmentService<R> {
    /// Creates a service using the default rejection-sampling strategy.
    pub fn new(repo: R) -> Self {
        Self::with_strategy(repo, Strategy::default())
    }

    /// Creates a service drawing with an explicit strategy.
    pub fn with_strategy(repo: R, strategy: Strategy) -> Self {
        Self { repo, strategy }
    }

    /// Draws and commits a fresh assignment set for `scope`.
    pub fn generate(&mut self, scope: &Scope) -> Result<GenerationStatus, AssignmentError> {
        self.generate_with_rng(scope, &mut rand::thread_rng())
    }

    /// Same as `generate` with a caller-supplied random source.
    ///
    /// # Errors
    /// - `InsufficientParticipants` when the scope has fewer than two members.
    /// - `DerangementFailed` when the strategy gives up; nothing is written.
    /// - `ParticipantsChanged` / `Store` when the commit is rolled back.
    pub fn generate_with_rng<G: Rng + ?Sized>(
        &mut self,
        scope: &Scope,
        rng: &mut G,
    ) -> Result<GenerationStatus, AssignmentError> {
        let started_at = Instant::now();
        let givers = self.repo.list_draw_pool(scope)?;
        if givers.len() < 2 {
            warn!(
                "event=assignments_generate module=service status=rejected scope={} participants={}",
                scope,
                givers.len()
            );
            return Err(AssignmentError::InsufficientParticipants {
                found: givers.len(),
            });
        }

        let assignments = derange(&givers, rng, self.strategy)?;
        let status = self.repo.replace_assignments(scope, &assignments)?;

        info!(
            "event=assignments_generate module=service status=ok scope={} strategy={} count={} duration_ms={}",
            scope,
            self.strategy.name(),
            status.assignment_count,
            started_at.elapsed().as_millis()
        );
        Ok(status)
    }

    /// Returns the receiver drawn by `giver`.
    pub fn lookup(&self, scope: &Scope, giver: &str) -> Result<String, AssignmentError> {
        let status = self.repo.generation_status(scope)?;
        if !status.generated {
            return Err(AssignmentError::NotReady);
        }
        self.repo
            .get_receiver(scope, giver)?
            .ok_or_else(|| AssignmentError::NotFound(giver.to_string()))
    }

    /// Reads the generation flag and row count of `scope`.
    pub fn status(&self, scope: &Scope) -> Result<GenerationStatus, AssignmentError> {
        Ok(self.repo.generation_status(scope)?)
    }

    /// Lists the full draw of `scope` ordered by giver.
    pub fn list(&self, scope: &Scope) -> Result<Vec<Assignment>, AssignmentError> {
        Ok(self.repo.list_assignments(scope)?)
    }

    /// Clears assignments, members and the flag of `scope`. Idempotent.
    pub fn reset(&mut self, scope: &Scope) -> Result<ResetSummary, AssignmentError> {
        let summary = self.repo.reset_scope(scope)?;
        info!(
            "event=scope_reset module=service status=ok scope={} assignments_removed={} participants_removed={}",
            scope, summary.assignments_removed, summary.participants_removed
        );
        Ok(summary)
    }
}
