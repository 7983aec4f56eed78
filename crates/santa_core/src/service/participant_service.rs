//! Participant use-case service.
//!
//! # Responsibility
//! - Validate and register participants with hashed passwords.
//! - Bootstrap the configured admin account.
//! - Remove participants with cascading assignment cleanup.
//!
//! # Invariants
//! - Plain-text passwords are hashed before reaching the repository.
//! - Hashing never needs a repository, so it can run outside a connection lock.
//! - Self-registration always creates `Role::Member`.

use crate::model::participant::{normalize_name, NameValidationError, Participant, Role};
use crate::model::scope::Scope;
use crate::repo::participant_repo::ParticipantRepository;
use crate::repo::RepoError;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for participant use-cases.
#[derive(Debug)]
pub enum ParticipantServiceError {
    /// Name failed normalization.
    InvalidName(NameValidationError),
    /// Password input was rejected before hashing.
    InvalidPassword(&'static str),
    /// Name already registered in the scope.
    DuplicateParticipant(String),
    /// Target participant does not exist.
    ParticipantNotFound(String),
    /// Password hashing failed.
    Hashing(bcrypt::BcryptError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ParticipantServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(err) => write!(f, "invalid name: {err}"),
            Self::InvalidPassword(reason) => write!(f, "invalid password: {reason}"),
            Self::DuplicateParticipant(name) => write!(f, "participant `{name}` already exists"),
            Self::ParticipantNotFound(name) => write!(f, "participant `{name}` not found"),
            Self::Hashing(err) => write!(f, "password hashing failed: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ParticipantServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidName(err) => Some(err),
            Self::Hashing(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ParticipantServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<NameValidationError> for ParticipantServiceError {
    fn from(value: NameValidationError) -> Self {
        Self::InvalidName(value)
    }
}

/// Validated registration input with its password already hashed.
///
/// Built without storage access so the bcrypt work can run outside any
/// connection lock.
#[derive(Debug, Clone)]
pub struct NewMember {
    name: String,
    password_hash: String,
}

impl NewMember {
    /// Normalizes `name`, rejects an empty password and hashes it.
    pub fn prepare(
        name: &str,
        password: &str,
        bcrypt_cost: u32,
    ) -> Result<Self, ParticipantServiceError> {
        let name = normalize_name(name)?;
        if password.is_empty() {
            return Err(ParticipantServiceError::InvalidPassword(
                "password must not be empty",
            ));
        }
        let password_hash =
            bcrypt::hash(password, bcrypt_cost).map_err(ParticipantServiceError::Hashing)?;
        Ok(Self {
            name,
            password_hash,
        })
    }

    /// Normalized name that will be stored.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Participant service facade over repository implementations.
pub struct ParticipantService<R: ParticipantRepository> {
    repo: R,
    bcrypt_cost: u32,
}

impl<R: ParticipantRepository> ParticipantService<R> {
    /// Creates a service hashing with `bcrypt::DEFAULT_COST`.
    pub fn new(repo: R) -> Self {
        Self::with_bcrypt_cost(repo, bcrypt::DEFAULT_COST)
    }

    /// Creates a service with an explicit bcrypt work factor.
    pub fn with_bcrypt_cost(repo: R, bcrypt_cost: u32) -> Self {
        Self { repo, bcrypt_cost }
    }

    /// Registers one member in `scope`.
    ///
    /// # Errors
    /// - `InvalidName` / `InvalidPassword` for rejected input.
    /// - `DuplicateParticipant` when the name is taken in the scope.
    pub fn register(
        &self,
        scope: &Scope,
        name: &str,
        password: &str,
    ) -> Result<Participant, ParticipantServiceError> {
        let member = NewMember::prepare(name, password, self.bcrypt_cost)?;
        self.register_prepared(scope, member)
    }

    /// Persists a member whose input was already validated and hashed.
    pub fn register_prepared(
        &self,
        scope: &Scope,
        member: NewMember,
    ) -> Result<Participant, ParticipantServiceError> {
        let NewMember {
            name,
            password_hash,
        } = member;
        let participant = self
            .repo
            .create_participant(scope, &name, &password_hash, Role::Member)
            .map_err(|err| match err {
                RepoError::Duplicate(_) => {
                    ParticipantServiceError::DuplicateParticipant(name.clone())
                }
                other => ParticipantServiceError::Repo(other),
            })?;

        info!(
            "event=participant_register module=service status=ok scope={}",
            scope
        );
        Ok(participant)
    }

    /// Creates or refreshes the global admin from a precomputed bcrypt hash.
    pub fn ensure_admin(
        &self,
        name: &str,
        password_hash: &str,
    ) -> Result<(), ParticipantServiceError> {
        let name = normalize_name(name)?;
        if !password_hash.starts_with("$2") {
            return Err(ParticipantServiceError::InvalidPassword(
                "admin password hash must be a bcrypt hash",
            ));
        }
        self.repo.upsert_admin(&name, password_hash)?;
        info!("event=admin_bootstrap module=service status=ok");
        Ok(())
    }

    /// Gets one participant by name.
    pub fn get(
        &self,
        scope: &Scope,
        name: &str,
    ) -> Result<Option<Participant>, ParticipantServiceError> {
        Ok(self.repo.get_participant(scope, name.trim())?)
    }

    /// Lists every participant of `scope` sorted by name.
    pub fn list(&self, scope: &Scope) -> Result<Vec<Participant>, ParticipantServiceError> {
        Ok(self.repo.list_participants(scope, None)?)
    }

    /// Removes one participant and every assignment it takes part in.
    pub fn remove(&mut self, scope: &Scope, name: &str) -> Result<(), ParticipantServiceError> {
        let name = name.trim();
        self.repo
            .delete_participant(scope, name)
            .map_err(|err| match err {
                RepoError::NotFound(_) => {
                    ParticipantServiceError::ParticipantNotFound(name.to_string())
                }
                other => ParticipantServiceError::Repo(other),
            })
    }
}
