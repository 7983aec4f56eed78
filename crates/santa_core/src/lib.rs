//! Core domain logic for the gift draw service.
//! This crate is the single source of truth for draw invariants.

pub mod db;
pub mod derangement;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use derangement::{derange, DerangementError, Strategy, DEFAULT_MAX_ATTEMPTS};
pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::assignment::{Assignment, GenerationStatus};
pub use model::participant::{normalize_name, NameValidationError, Participant, Role};
pub use model::scope::{InvalidGroupCode, Scope};
pub use repo::assignment_repo::{AssignmentRepository, ResetSummary, SqliteAssignmentRepository};
pub use repo::participant_repo::{ParticipantRepository, SqliteParticipantRepository};
pub use repo::session_repo::{
    SessionRecord, SessionRepository, SqliteSessionRepository, StoredCredentials,
};
pub use repo::{RepoError, RepoResult};
pub use service::assignment_service::{AssignmentError, AssignmentService};
pub use service::auth_service::{
    verify_password, AuthError, AuthService, Identity, PendingLogin, Session, DEFAULT_SESSION_TTL,
};
pub use service::participant_service::{NewMember, ParticipantService, ParticipantServiceError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
