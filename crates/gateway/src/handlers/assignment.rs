//! Batch assignment handlers

use axum::{extract::State, Json};
use talentforge_common::{
    db::models::Assignment,
    errors::Result,
    services::{assignment::AssignmentInput, AssignmentService},
    validation::Check,
};

use crate::extract::{JsonBody, Paging, Scope};
use crate::response::{Created, Listed, Message, NoContent};
use crate::AppState;

pub async fn add_assignment(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<AssignmentInput>,
) -> Result<Created> {
    let actor = scope.writer()?;
    let batch_id = scope.uuid("batch_id")?;
    input.check()?;

    let id = AssignmentService::new(state.db.clone())
        .add_assignment(scope.tenant_id, batch_id, actor, &input)
        .await?;
    Ok(Created(id))
}

pub async fn update_assignment(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<AssignmentInput>,
) -> Result<Message> {
    let actor = scope.writer()?;
    let batch_id = scope.uuid("batch_id")?;
    let assignment_id = scope.uuid("assignment_id")?;
    input.check()?;

    AssignmentService::new(state.db.clone())
        .update_assignment(scope.tenant_id, batch_id, assignment_id, actor, &input)
        .await?;
    Ok(Message("Assignment updated successfully"))
}

pub async fn delete_assignment(State(state): State<AppState>, scope: Scope) -> Result<NoContent> {
    let actor = scope.writer()?;
    let batch_id = scope.uuid("batch_id")?;
    let assignment_id = scope.uuid("assignment_id")?;

    AssignmentService::new(state.db.clone())
        .delete_assignment(scope.tenant_id, batch_id, assignment_id, actor)
        .await?;
    Ok(NoContent)
}

pub async fn get_assignment(
    State(state): State<AppState>,
    scope: Scope,
) -> Result<Json<Assignment>> {
    let batch_id = scope.uuid("batch_id")?;
    let assignment_id = scope.uuid("assignment_id")?;

    let assignment = AssignmentService::new(state.db.clone())
        .get_assignment(scope.tenant_id, batch_id, assignment_id)
        .await?;
    Ok(Json(assignment))
}

pub async fn get_assignment_list(
    State(state): State<AppState>,
    scope: Scope,
    Paging(page): Paging,
) -> Result<Listed<Assignment>> {
    let batch_id = scope.uuid("batch_id")?;

    let page = AssignmentService::new(state.db.clone())
        .get_assignment_list(scope.tenant_id, batch_id, page)
        .await?;
    Ok(page.into())
}
