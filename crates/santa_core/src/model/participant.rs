//! Participant model and name normalization.
//!
//! # Invariants
//! - Names are trimmed and 1..=64 characters without control characters.
//! - `me` and `status` are reserved because they collide with HTTP routes.
//! - `Admin` participants are never part of a draw.

use crate::model::scope::Scope;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const MAX_NAME_CHARS: usize = 64;
const RESERVED_NAMES: &[&str] = &["me", "status"];

/// Privilege level of a registered participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Operator account; manages draws, never drawn.
    Admin,
    /// Regular participant taking part in the draw.
    Member,
}

impl Role {
    /// Value stored in the `role` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Member => "member",
        }
    }

    /// Inverse of [`Role::as_str`]; `None` for unknown text.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            _ => None,
        }
    }
}

/// Registered participant read model. The password hash stays in storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub name: String,
    pub scope: Scope,
    pub role: Role,
    /// Epoch milliseconds.
    pub created_at: i64,
}

/// Rejected participant name input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameValidationError {
    Empty,
    TooLong(usize),
    ControlCharacter,
    Reserved(String),
}

impl Display for NameValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "name must not be blank"),
            Self::TooLong(len) => {
                write!(f, "name has {len} chars; at most {MAX_NAME_CHARS} allowed")
            }
            Self::ControlCharacter => write!(f, "name must not contain control characters"),
            Self::Reserved(name) => write!(f, "name `{name}` is reserved"),
        }
    }
}

impl Error for NameValidationError {}

/// Normalizes a participant name according to the naming contract.
pub fn normalize_name(raw: &str) -> Result<String, NameValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(NameValidationError::Empty);
    }
    let len = trimmed.chars().count();
    if len > MAX_NAME_CHARS {
        return Err(NameValidationError::TooLong(len));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(NameValidationError::ControlCharacter);
    }
    if RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(trimmed))
    {
        return Err(NameValidationError::Reserved(trimmed.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{normalize_name, NameValidationError, Role};

    #[test]
    fn normalize_name_trims_and_accepts_unicode() {
        assert_eq!(normalize_name("  Zoë ").unwrap(), "Zoë");
    }

    #[test]
    fn normalize_name_rejects_bad_input() {
        assert_eq!(normalize_name(" \t"), Err(NameValidationError::Empty));
        assert_eq!(
            normalize_name("a\u{0007}b"),
            Err(NameValidationError::ControlCharacter)
        );
        assert!(matches!(
            normalize_name("Status"),
            Err(NameValidationError::Reserved(_))
        ));
        assert!(matches!(
            normalize_name(&"n".repeat(65)),
            Err(NameValidationError::TooLong(65))
        ));
    }

    #[test]
    fn role_text_roundtrips() {
        for role in [Role::Admin, Role::Member] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("root"), None);
    }
}
