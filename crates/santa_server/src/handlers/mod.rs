mod app;
mod assignments;
mod participants;
mod session;

pub use app::{index, router};

use santa_core::Scope;
use serde::Deserialize;

use crate::auth::Authenticated;
use crate::config::Settings;
use crate::error::ApiError;

/// `?group_code=` selector accepted by scope-taking routes.
#[derive(Debug, Default, Deserialize)]
pub struct ScopeQuery {
    pub group_code: Option<String>,
}

/// Parses a caller-supplied group code.
///
/// A blank code is the global scope unless the deployment requires codes.
pub fn resolve_scope(settings: &Settings, code: Option<&str>) -> Result<Scope, ApiError> {
    let blank = code.map_or(true, |code| code.trim().is_empty());
    if blank && settings.require_group_code {
        return Err(ApiError::MissingGroupCode);
    }
    Scope::from_group_code(code).map_err(|err| ApiError::BadRequest(err.to_string()))
}

/// Scope the caller acts in: members are pinned to their token scope,
/// admins pick one with `group_code`.
pub fn caller_scope(
    settings: &Settings,
    caller: &Authenticated,
    code: Option<&str>,
) -> Result<Scope, ApiError> {
    if caller.identity.is_admin() {
        resolve_scope(settings, code)
    } else {
        Ok(caller.identity.scope.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_code_is_global_unless_required() {
        let settings = Settings::default();
        assert_eq!(resolve_scope(&settings, None).unwrap(), Scope::Global);
        assert_eq!(resolve_scope(&settings, Some("  ")).unwrap(), Scope::Global);
        assert_eq!(
            resolve_scope(&settings, Some("team-a")).unwrap(),
            Scope::Group("team-a".to_owned())
        );

        let strict = Settings {
            require_group_code: true,
            ..Settings::default()
        };
        assert!(matches!(
            resolve_scope(&strict, None),
            Err(ApiError::MissingGroupCode)
        ));
        assert!(matches!(
            resolve_scope(&strict, Some("bad code!")),
            Err(ApiError::BadRequest(_))
        ));
    }
}
