use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use santa_core::{
    verify_password, AuthService, NewMember, Participant, ParticipantService, Role, Scope,
    SqliteParticipantRepository, SqliteSessionRepository,
};
use serde::{Deserialize, Serialize};

use super::{resolve_scope, ScopeQuery};
use crate::auth::{basic_credentials, Authenticated};
use crate::error::ApiError;
use crate::state::{run_blocking, AppState};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub group_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub group_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub role: Role,
    /// Epoch milliseconds.
    pub expires_at: i64,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Participant>), ApiError> {
    let scope = resolve_scope(&state.settings, payload.group_code.as_deref())?;
    let bcrypt_cost = state.settings.bcrypt_cost;

    let member = run_blocking(move || {
        Ok(NewMember::prepare(
            &payload.name,
            &payload.password,
            bcrypt_cost,
        )?)
    })
    .await?;

    let participant = state
        .store
        .run(move |conn| {
            let service = ParticipantService::new(SqliteParticipantRepository::try_new(conn)?);
            Ok(service.register_prepared(&scope, member)?)
        })
        .await?;

    Ok((StatusCode::CREATED, Json(participant)))
}

/// Issues a bearer token from a JSON body or `Authorization: Basic`.
///
/// A missing group code always means the global scope here, and an admin
/// is found in the global scope whatever code is sent. Password checks run
/// outside the store lock.
pub async fn login(
    State(state): State<AppState>,
    Query(query): Query<ScopeQuery>,
    headers: HeaderMap,
    body: Option<Json<LoginRequest>>,
) -> Result<Json<LoginResponse>, ApiError> {
    let (name, password, group_code) = match body {
        Some(Json(payload)) => (
            payload.name,
            payload.password,
            payload.group_code.or(query.group_code),
        ),
        None => {
            let credentials = basic_credentials(&headers)?
                .ok_or(ApiError::Unauthorized("missing credentials"))?;
            (credentials.name, credentials.password, query.group_code)
        }
    };
    let scope = Scope::from_group_code(group_code.as_deref())
        .map_err(|err| ApiError::BadRequest(err.to_string()))?;
    let session_ttl = state.settings.session_ttl;

    let pending = state
        .store
        .run(move |conn| {
            let auth = AuthService::new(SqliteSessionRepository::try_new(conn)?);
            Ok(auth.load_credentials(&scope, &name)?)
        })
        .await?;

    let pending = run_blocking(move || {
        verify_password(&pending, &password)?;
        Ok(pending)
    })
    .await?;

    let session = state
        .store
        .run(move |conn| {
            let repo = SqliteSessionRepository::try_new(conn)?;
            let auth = AuthService::with_session_ttl(repo, session_ttl);
            Ok(auth.issue_session(&pending)?)
        })
        .await?;

    Ok(Json(LoginResponse {
        token: session.token,
        role: session.identity.role,
        expires_at: session.expires_at,
    }))
}

pub async fn logout(
    State(state): State<AppState>,
    caller: Authenticated,
) -> Result<StatusCode, ApiError> {
    let token = caller.token;
    state
        .store
        .run(move |conn| {
            let auth = AuthService::new(SqliteSessionRepository::try_new(conn)?);
            Ok(auth.logout(&token)?)
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
