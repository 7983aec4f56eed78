use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use santa_core::{Participant, ParticipantService, SqliteParticipantRepository};

use super::{resolve_scope, ScopeQuery};
use crate::auth::Authenticated;
use crate::error::ApiError;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    caller: Authenticated,
    Query(query): Query<ScopeQuery>,
) -> Result<Json<Vec<Participant>>, ApiError> {
    caller.require_admin()?;
    let scope = resolve_scope(&state.settings, query.group_code.as_deref())?;

    let participants = state
        .store
        .run(move |conn| {
            let service = ParticipantService::new(SqliteParticipantRepository::try_new(conn)?);
            Ok(service.list(&scope)?)
        })
        .await?;

    Ok(Json(participants))
}

pub async fn remove(
    State(state): State<AppState>,
    caller: Authenticated,
    Path(name): Path<String>,
    Query(query): Query<ScopeQuery>,
) -> Result<StatusCode, ApiError> {
    caller.require_admin()?;
    let scope = resolve_scope(&state.settings, query.group_code.as_deref())?;

    state
        .store
        .run(move |conn| {
            let mut service =
                ParticipantService::new(SqliteParticipantRepository::try_new(conn)?);
            Ok(service.remove(&scope, &name)?)
        })
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
