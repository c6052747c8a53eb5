//! Batch handlers, including enrolment and module assignment

use axum::{extract::State, Json};
use talentforge_common::{
    db::models::Batch,
    errors::Result,
    pagination::Paged,
    services::{
        batch::{
            AssignModulesInput, BatchDetail, BatchFilter, BatchInput, BatchModuleView,
            BatchTalentView, EnrolInput, EnrolOutcome,
        },
        BatchService,
    },
    validation::Check,
};

use crate::extract::{Filter, JsonBody, Paging, Scope};
use crate::response::{Created, Listed, Message, NoContent};
use crate::AppState;

pub async fn add_batch(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<BatchInput>,
) -> Result<Created> {
    let actor = scope.writer()?;
    input.check()?;

    let id = BatchService::new(state.db.clone())
        .add_batch(scope.tenant_id, actor, &input)
        .await?;
    Ok(Created(id))
}

pub async fn update_batch(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<BatchInput>,
) -> Result<Message> {
    let actor = scope.writer()?;
    let batch_id = scope.uuid("batch_id")?;
    input.check()?;

    BatchService::new(state.db.clone())
        .update_batch(scope.tenant_id, batch_id, actor, &input)
        .await?;
    Ok(Message("Batch updated successfully"))
}

pub async fn delete_batch(State(state): State<AppState>, scope: Scope) -> Result<NoContent> {
    let actor = scope.writer()?;
    let batch_id = scope.uuid("batch_id")?;

    BatchService::new(state.db.clone())
        .delete_batch(scope.tenant_id, batch_id, actor)
        .await?;
    Ok(NoContent)
}

pub async fn get_batch(State(state): State<AppState>, scope: Scope) -> Result<Json<BatchDetail>> {
    let batch_id = scope.uuid("batch_id")?;

    let detail = BatchService::new(state.db.clone())
        .get_batch(scope.tenant_id, batch_id)
        .await?;
    Ok(Json(detail))
}

pub async fn get_batch_list(
    State(state): State<AppState>,
    scope: Scope,
    Filter(filter): Filter<BatchFilter>,
    Paging(page): Paging,
) -> Result<Listed<Batch>> {
    let page = BatchService::new(state.db.clone())
        .get_batch_list(scope.tenant_id, &filter, page)
        .await?;
    Ok(page.into())
}

/// Enrol talents; ones already enrolled are skipped
pub async fn add_talents_to_batch(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<EnrolInput>,
) -> Result<Json<EnrolOutcome>> {
    let actor = scope.writer()?;
    let batch_id = scope.uuid("batch_id")?;
    input.check()?;

    let outcome = BatchService::new(state.db.clone())
        .add_talents_to_batch(scope.tenant_id, batch_id, actor, &input.talent_ids)
        .await?;
    Ok(Json(outcome))
}

pub async fn remove_talent_from_batch(
    State(state): State<AppState>,
    scope: Scope,
) -> Result<NoContent> {
    let actor = scope.writer()?;
    let batch_id = scope.uuid("batch_id")?;
    let talent_id = scope.uuid("talent_id")?;

    BatchService::new(state.db.clone())
        .remove_talent_from_batch(scope.tenant_id, batch_id, talent_id, actor)
        .await?;
    Ok(NoContent)
}

pub async fn get_batch_talent_list(
    State(state): State<AppState>,
    scope: Scope,
    Paging(page): Paging,
) -> Result<Listed<BatchTalentView>> {
    let batch_id = scope.uuid("batch_id")?;

    let list = BatchService::new(state.db.clone())
        .get_batch_talent_list(scope.tenant_id, batch_id, page)
        .await?;
    Ok(Listed::new(list.page).header("x-total-talents", list.active_talents))
}

/// Replace the module sequence of a batch
pub async fn assign_batch_modules(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<AssignModulesInput>,
) -> Result<Message> {
    let actor = scope.writer()?;
    let batch_id = scope.uuid("batch_id")?;
    input.check()?;

    BatchService::new(state.db.clone())
        .assign_batch_modules(scope.tenant_id, batch_id, actor, &input)
        .await?;
    Ok(Message("Batch modules assigned successfully"))
}

pub async fn get_batch_module_list(
    State(state): State<AppState>,
    scope: Scope,
) -> Result<Listed<BatchModuleView>> {
    let batch_id = scope.uuid("batch_id")?;

    let modules = BatchService::new(state.db.clone())
        .get_batch_module_list(scope.tenant_id, batch_id)
        .await?;
    let total = modules.len() as u64;
    Ok(Listed::new(Paged::new(modules, total)))
}
