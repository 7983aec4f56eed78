use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use santa_core::{AuthService, Identity, SqliteSessionRepository};

use crate::error::ApiError;
use crate::state::AppState;

/// Caller resolved from an `Authorization: Bearer` header.
pub struct Authenticated {
    pub identity: Identity,
    pub token: String,
}

impl Authenticated {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.identity.is_admin() {
            Ok(())
        } else {
            Err(ApiError::Forbidden("admin role required"))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let token = bearer_token(&parts.headers)
            .ok_or(ApiError::Unauthorized("missing bearer token"))?
            .to_owned();

        let lookup = token.clone();
        let identity = state
            .store
            .run(move |conn| {
                let auth = AuthService::new(SqliteSessionRepository::try_new(conn)?);
                Ok(auth.verify(&lookup)?)
            })
            .await?;

        Ok(Self { identity, token })
    }
}

/// Name and password carried by `Authorization: Basic`.
#[derive(Debug, PartialEq, Eq)]
pub struct BasicCredentials {
    pub name: String,
    pub password: String,
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = strip_scheme(value, "Bearer")?.trim();
    (!token.is_empty()).then_some(token)
}

/// Parses Basic credentials; `Err` when the header is present but malformed.
pub fn basic_credentials(headers: &HeaderMap) -> Result<Option<BasicCredentials>, ApiError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| ApiError::Unauthorized("malformed authorization header"))?;
    let Some(encoded) = strip_scheme(value, "Basic") else {
        return Ok(None);
    };

    let decoded = STANDARD
        .decode(encoded.trim())
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .ok_or(ApiError::Unauthorized("malformed basic credentials"))?;
    let (name, password) = decoded
        .split_once(':')
        .ok_or(ApiError::Unauthorized("malformed basic credentials"))?;

    Ok(Some(BasicCredentials {
        name: name.to_owned(),
        password: password.to_owned(),
    }))
}

fn strip_scheme<'a>(value: &'a str, scheme: &str) -> Option<&'a str> {
    let (given, rest) = value.split_once(' ')?;
    given.eq_ignore_ascii_case(scheme).then_some(rest)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_is_extracted_case_insensitively() {
        assert_eq!(bearer_token(&headers("Bearer abc123")), Some("abc123"));
        assert_eq!(bearer_token(&headers("bearer  abc123 ")), Some("abc123"));
        assert_eq!(bearer_token(&headers("Basic abc123")), None);
        assert_eq!(bearer_token(&headers("Bearer ")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn basic_credentials_split_on_first_colon() {
        let encoded = STANDARD.encode("alice:pa:ss");
        let parsed = basic_credentials(&headers(&format!("Basic {encoded}")))
            .unwrap()
            .unwrap();
        assert_eq!(
            parsed,
            BasicCredentials {
                name: "alice".to_owned(),
                password: "pa:ss".to_owned(),
            }
        );
    }

    #[test]
    fn basic_credentials_absent_or_malformed() {
        assert!(basic_credentials(&HeaderMap::new()).unwrap().is_none());
        assert!(basic_credentials(&headers("Bearer x")).unwrap().is_none());
        assert!(basic_credentials(&headers("Basic !!!")).is_err());
        let no_colon = STANDARD.encode("alice");
        assert!(basic_credentials(&headers(&format!("Basic {no_colon}"))).is_err());
    }
}
