//! Partition key for participants, assignments and the generation flag.
//!
//! # Invariants
//! - The global scope is stored as the empty string.
//! - Group codes are trimmed, non-empty and match `[A-Za-z0-9_-]{1,64}`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static GROUP_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid group code regex"));

const GLOBAL_STORAGE_KEY: &str = "";

/// Draw partition. Single-tenant deployments only ever use `Global`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Global,
    Group(String),
}

/// Rejected group code input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidGroupCode(pub String);

impl Display for InvalidGroupCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid group code `{}`; expected 1-64 chars of [A-Za-z0-9_-]",
            self.0
        )
    }
}

impl Error for InvalidGroupCode {}

impl Scope {
    /// Parses an optional group code; blank or missing input is the global scope.
    pub fn from_group_code(code: Option<&str>) -> Result<Self, InvalidGroupCode> {
        match code.map(str::trim) {
            None | Some("") => Ok(Self::Global),
            Some(value) if GROUP_CODE_RE.is_match(value) => Ok(Self::Group(value.to_string())),
            Some(value) => Err(InvalidGroupCode(value.to_string())),
        }
    }

    /// Rebuilds a scope from its persisted key.
    pub fn from_storage_key(key: &str) -> Self {
        if key == GLOBAL_STORAGE_KEY {
            Self::Global
        } else {
            Self::Group(key.to_string())
        }
    }

    /// Value written to the `scope` column.
    pub fn storage_key(&self) -> &str {
        match self {
            Self::Global => GLOBAL_STORAGE_KEY,
            Self::Group(code) => code.as_str(),
        }
    }

    /// Group code, or `None` for the global scope.
    pub fn group_code(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Group(code) => Some(code.as_str()),
        }
    }

    /// Whether this is the single-tenant scope.
    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Group(code) => write!(f, "group:{code}"),
        }
    }
}
