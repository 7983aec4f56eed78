use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use santa_core::{Assignment, AssignmentService, Scope, SqliteAssignmentRepository};
use serde::{Deserialize, Serialize};

use super::{caller_scope, resolve_scope, ScopeQuery};
use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub generated: bool,
    pub count: u32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub generated: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReceiverResponse {
    pub receiver: String,
}

/// Optional body of admin-only POST routes; `group_code` here wins over the query.
#[derive(Debug, Default, Deserialize)]
pub struct ScopeBody {
    #[serde(default)]
    pub group_code: Option<String>,
}

fn admin_scope(
    state: &AppState,
    caller: &Authenticated,
    query: ScopeQuery,
    body: Option<Json<ScopeBody>>,
) -> Result<Scope, ApiError> {
    caller.require_admin()?;
    let code = body
        .and_then(|Json(body)| body.group_code)
        .or(query.group_code);
    resolve_scope(&state.settings, code.as_deref())
}

pub async fn generate(
    State(state): State<AppState>,
    caller: Authenticated,
    Query(query): Query<ScopeQuery>,
    body: Option<Json<ScopeBody>>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let scope = admin_scope(&state, &caller, query, body)?;
    let strategy = state.settings.strategy;

    let status = state
        .store
        .run(move |conn| {
            let repo = SqliteAssignmentRepository::try_new(conn)?;
            let mut service = AssignmentService::with_strategy(repo, strategy);
            Ok(service.generate(&scope)?)
        })
        .await?;

    Ok(Json(GenerateResponse {
        generated: status.generated,
        count: status.assignment_count,
    }))
}

pub async fn list(
    State(state): State<AppState>,
    caller: Authenticated,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<Vec<Assignment>>, ApiError> {
    caller.require_admin()?;
    let scope = resolve_scope(&state.settings, query.group_code.as_deref())?;

    let assignments = state
        .store
        .run(move |conn| {
            let service = AssignmentService::new(SqliteAssignmentRepository::try_new(conn)?);
            Ok(service.list(&scope)?)
        })
        .await?;

    Ok(Json(assignments))
}

pub async fn status(
    State(state): State<AppState>,
    caller: Authenticated,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    let scope = caller_scope(&state.settings, &caller, query.group_code.as_deref())?;

    let status = state
        .store
        .run(move |conn| {
            let service = AssignmentService::new(SqliteAssignmentRepository::try_new(conn)?);
            Ok(service.status(&scope)?)
        })
        .await?;

    Ok(Json(StatusResponse {
        generated: status.generated,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    caller: Authenticated,
) -> Result<Json<ReceiverResponse>, ApiError> {
    if caller.identity.is_admin() {
        return Err(ApiError::Forbidden("admins are not part of the draw"));
    }
    let scope = caller.identity.scope.clone();
    let giver = caller.identity.name.clone();

    receiver_of(&state, scope, giver).await.map(Json)
}

pub async fn lookup(
    State(state): State<AppState>,
    caller: Authenticated,
    Path(participant): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<ReceiverResponse>, ApiError> {
    let participant = participant.trim().to_owned();
    if !caller.identity.is_admin() && caller.identity.name != participant {
        return Err(ApiError::Forbidden("members may only look up their own draw"));
    }
    let scope = caller_scope(&state.settings, &caller, query.group_code.as_deref())?;

    receiver_of(&state, scope, participant).await.map(Json)
}

async fn receiver_of(
    state: &AppState,
    scope: Scope,
    giver: String,
) -> Result<ReceiverResponse, ApiError> {
    let receiver = state
        .store
        .run(move |conn| {
            let service = AssignmentService::new(SqliteAssignmentRepository::try_new(conn)?);
            Ok(service.lookup(&scope, &giver)?)
        })
        .await?;

    Ok(ReceiverResponse { receiver })
}

pub async fn reset(
    State(state): State<AppState>,
    caller: Authenticated,
    Query(query): Query<ScopeQuery>,
    body: Option<Json<ScopeBody>>,
) -> Result<StatusCode, ApiError> {
    let scope = admin_scope(&state, &caller, query, body)?;

    state
        .store
        .run(move |conn| {
            let mut service =
                AssignmentService::new(SqliteAssignmentRepository::try_new(conn)?);
            service.reset(&scope)?;
            Ok(())
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
