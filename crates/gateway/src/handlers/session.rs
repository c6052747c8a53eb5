//! Session plan handlers

use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};
use talentforge_common::{
    errors::Result,
    pagination::Paged,
    services::{
        session::{SessionUpdateInput, SessionView},
        SessionService,
    },
    validation::Check,
};

use crate::extract::{JsonBody, Scope};
use crate::response::{Listed, Message, NoContent};
use crate::AppState;

/// Lay the batch's topics out over its calendar
pub async fn generate_session_plan(
    State(state): State<AppState>,
    scope: Scope,
) -> Result<(StatusCode, Json<Value>)> {
    let actor = scope.writer()?;
    let batch_id = scope.uuid("batch_id")?;

    let count = SessionService::new(state.db.clone())
        .generate_session_plan(scope.tenant_id, batch_id, actor)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "sessionCount": count }))))
}

pub async fn get_session_plan(
    State(state): State<AppState>,
    scope: Scope,
) -> Result<Listed<SessionView>> {
    let batch_id = scope.uuid("batch_id")?;

    let plan = SessionService::new(state.db.clone())
        .get_session_plan(scope.tenant_id, batch_id)
        .await?;
    let total = plan.sessions.len() as u64;
    Ok(Listed::new(Paged::new(plan.sessions, total))
        .header("x-completed-count", plan.completed_count))
}

pub async fn delete_session_plan(State(state): State<AppState>, scope: Scope) -> Result<NoContent> {
    let actor = scope.writer()?;
    let batch_id = scope.uuid("batch_id")?;

    SessionService::new(state.db.clone())
        .delete_session_plan(scope.tenant_id, batch_id, actor)
        .await?;
    Ok(NoContent)
}

pub async fn get_session(State(state): State<AppState>, scope: Scope) -> Result<Json<SessionView>> {
    let batch_id = scope.uuid("batch_id")?;
    let session_id = scope.uuid("session_id")?;

    let session = SessionService::new(state.db.clone())
        .get_session(scope.tenant_id, batch_id, session_id)
        .await?;
    Ok(Json(session))
}

/// Record session completion and which of its topics were covered
pub async fn update_session(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<SessionUpdateInput>,
) -> Result<Message> {
    let actor = scope.writer()?;
    let batch_id = scope.uuid("batch_id")?;
    let session_id = scope.uuid("session_id")?;
    input.check()?;

    SessionService::new(state.db.clone())
        .update_session(scope.tenant_id, batch_id, session_id, actor, &input)
        .await?;
    Ok(Message("Session updated successfully"))
}
