//! Interview handlers, nested under a talent

use axum::{extract::State, Json};
use talentforge_common::{
    db::models::Interview,
    errors::Result,
    services::{
        interview::{InterviewFilter, InterviewInput},
        InterviewService,
    },
    validation::Check,
};

use crate::extract::{Filter, JsonBody, Paging, Scope};
use crate::response::{Created, Listed, Message, NoContent};
use crate::AppState;

pub async fn add_interview(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<InterviewInput>,
) -> Result<Created> {
    let actor = scope.writer()?;
    let talent_id = scope.uuid("talent_id")?;
    input.check()?;

    let id = InterviewService::new(state.db.clone())
        .add_interview(scope.tenant_id, talent_id, actor, &input)
        .await?;
    Ok(Created(id))
}

pub async fn update_interview(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<InterviewInput>,
) -> Result<Message> {
    let actor = scope.writer()?;
    let talent_id = scope.uuid("talent_id")?;
    let interview_id = scope.uuid("interview_id")?;
    input.check()?;

    InterviewService::new(state.db.clone())
        .update_interview(scope.tenant_id, talent_id, interview_id, actor, &input)
        .await?;
    Ok(Message("Interview updated successfully"))
}

pub async fn delete_interview(State(state): State<AppState>, scope: Scope) -> Result<NoContent> {
    let actor = scope.writer()?;
    let talent_id = scope.uuid("talent_id")?;
    let interview_id = scope.uuid("interview_id")?;

    InterviewService::new(state.db.clone())
        .delete_interview(scope.tenant_id, talent_id, interview_id, actor)
        .await?;
    Ok(NoContent)
}

pub async fn get_interview(State(state): State<AppState>, scope: Scope) -> Result<Json<Interview>> {
    let talent_id = scope.uuid("talent_id")?;
    let interview_id = scope.uuid("interview_id")?;

    let interview = InterviewService::new(state.db.clone())
        .get_interview(scope.tenant_id, talent_id, interview_id)
        .await?;
    Ok(Json(interview))
}

pub async fn get_interview_list(
    State(state): State<AppState>,
    scope: Scope,
    Filter(filter): Filter<InterviewFilter>,
    Paging(page): Paging,
) -> Result<Listed<Interview>> {
    let talent_id = scope.uuid("talent_id")?;

    let page = InterviewService::new(state.db.clone())
        .get_interview_list(scope.tenant_id, talent_id, &filter, page)
        .await?;
    Ok(page.into())
}
