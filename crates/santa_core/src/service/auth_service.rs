//! Credential service: password login and bearer token verification.
//!
//! # Responsibility
//! - Verify passwords against stored bcrypt hashes.
//! - Issue, verify and revoke opaque session tokens.
//!
//! # Invariants
//! - Unknown names and wrong passwords fail identically.
//! - A token is valid strictly before its `expires_at`.
//! - Admins authenticate against the global scope whatever scope is requested.
//! - Tokens and passwords are never logged.

use crate::model::participant::Role;
use crate::model::scope::Scope;
use crate::repo::session_repo::{SessionRecord, SessionRepository, StoredCredentials};
use crate::repo::{now_epoch_ms, RepoError};
use log::{info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use uuid::Uuid;

/// Default token lifetime.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Errors from credential operations.
#[derive(Debug)]
pub enum AuthError {
    /// Name unknown in scope or password mismatch.
    InvalidCredentials,
    /// Token was never issued or has been revoked.
    InvalidToken,
    /// Token lifetime elapsed.
    Expired,
    /// Stored hash could not be checked.
    Hashing(bcrypt::BcryptError),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid name or password"),
            Self::InvalidToken => write!(f, "invalid token"),
            Self::Expired => write!(f, "token expired"),
            Self::Hashing(err) => write!(f, "password verification failed: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for AuthError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Hashing(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for AuthError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub name: String,
    pub scope: Scope,
    pub role: Role,
}

impl Identity {
    /// Whether the caller may manage draws.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Token issued by a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub identity: Identity,
    /// Epoch milliseconds.
    pub expires_at: i64,
}

/// Credentials loaded for one login attempt, not yet verified.
#[derive(Debug, Clone)]
pub struct PendingLogin {
    scope: Scope,
    name: String,
    role: Role,
    password_hash: String,
}

impl PendingLogin {
    fn new(scope: Scope, name: &str, credentials: StoredCredentials) -> Self {
        Self {
            scope,
            name: name.to_string(),
            role: credentials.role,
            password_hash: credentials.password_hash,
        }
    }

    /// Scope the session will be issued for.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Role the session will carry.
    pub fn role(&self) -> Role {
        self.role
    }
}

/// Checks `password` against the loaded bcrypt hash. Needs no storage access.
pub fn verify_password(pending: &PendingLogin, password: &str) -> Result<(), AuthError> {
    let matches = bcrypt::verify(password, &pending.password_hash).map_err(AuthError::Hashing)?;
    if !matches {
        warn!(
            "event=login module=auth status=rejected scope={} reason=bad_password",
            pending.scope
        );
        return Err(AuthError::InvalidCredentials);
    }
    Ok(())
}

/// Credential service facade over repository implementations.
pub struct AuthService<R: SessionRepository> {
    repo: R,
    session_ttl: Duration,
}

impl<R: SessionRepository> AuthService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_session_ttl(repo, DEFAULT_SESSION_TTL)
    }

    pub fn with_session_ttl(repo: R, session_ttl: Duration) -> Self {
        Self { repo, session_ttl }
    }

    /// Verifies `password` and issues a fresh token.
    ///
    /// Runs [`Self::load_credentials`], [`verify_password`] and
    /// [`Self::issue_session`] in sequence. Callers sharing one connection
    /// should run the three steps separately so hashing never holds it.
    pub fn login(&self, scope: &Scope, name: &str, password: &str) -> Result<Session, AuthError> {
        let pending = self.load_credentials(scope, name)?;
        verify_password(&pending, password)?;
        self.issue_session(&pending)
    }

    /// Looks up the stored hash for `name` in `scope`.
    ///
    /// A name missing from a group scope falls back to the global scope, where
    /// only an admin is accepted; admins therefore sign in whatever group
    /// code the client sends.
    pub fn load_credentials(&self, scope: &Scope, name: &str) -> Result<PendingLogin, AuthError> {
        let name = name.trim();
        if let Some(credentials) = self.repo.load_credentials(scope, name)? {
            return Ok(PendingLogin::new(scope.clone(), name, credentials));
        }

        if !scope.is_global() {
            if let Some(credentials) = self.repo.load_credentials(&Scope::Global, name)? {
                if credentials.role == Role::Admin {
                    return Ok(PendingLogin::new(Scope::Global, name, credentials));
                }
            }
        }

        warn!(
            "event=login module=auth status=rejected scope={} reason=unknown_name",
            scope
        );
        Err(AuthError::InvalidCredentials)
    }

    /// Stores a new token for an already verified login.
    ///
    /// Expired tokens of every participant are purged as a side effect.
    pub fn issue_session(&self, pending: &PendingLogin) -> Result<Session, AuthError> {
        let now = now_epoch_ms();
        let purged = self.repo.delete_expired_sessions(now)?;
        let ttl_ms = i64::try_from(self.session_ttl.as_millis()).unwrap_or(i64::MAX);
        let record = SessionRecord {
            token: Uuid::new_v4().simple().to_string(),
            scope: pending.scope.clone(),
            name: pending.name.clone(),
            role: pending.role,
            created_at: now,
            expires_at: now.saturating_add(ttl_ms),
        };
        self.repo.create_session(&record)?;

        info!(
            "event=login module=auth status=ok scope={} role={} purged_sessions={}",
            record.scope,
            record.role.as_str(),
            purged
        );
        Ok(Session {
            identity: Identity {
                name: record.name,
                scope: record.scope,
                role: record.role,
            },
            token: record.token,
            expires_at: record.expires_at,
        })
    }

    /// Resolves a bearer token to the identity it was issued for.
    pub fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        let Some(session) = self.repo.get_session(token)? else {
            return Err(AuthError::InvalidToken);
        };
        if now_epoch_ms() >= session.expires_at {
            self.repo.delete_session(token)?;
            return Err(AuthError::Expired);
        }
        Ok(Identity {
            name: session.name,
            scope: session.scope,
            role: session.role,
        })
    }

    /// Revokes a token. Unknown tokens are ignored.
    pub fn logout(&self, token: &str) -> Result<(), AuthError> {
        if self.repo.delete_session(token)? {
            info!("event=logout module=auth status=ok");
        }
        Ok(())
    }
}
