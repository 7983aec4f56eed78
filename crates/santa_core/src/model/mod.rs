//! Domain model for the gift draw.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Own input normalization rules for names and group codes.
//!
//! # Invariants
//! - Every participant, assignment and generation flag lives in exactly one
//!   `Scope`.
//! - Names are unique within a scope, never across scopes.

pub mod assignment;
pub mod participant;
pub mod scope;
