//! Waiting list handlers

use axum::{extract::State, Json};
use talentforge_common::{
    db::models::WaitingList,
    errors::Result,
    services::{
        batch::EnrolOutcome,
        waiting_list::{TransferInput, WaitingListFilter, WaitingListInput},
        WaitingListService,
    },
    validation::Check,
};

use crate::extract::{Filter, JsonBody, Paging, Scope};
use crate::response::{Created, Listed, Message, NoContent};
use crate::AppState;

pub async fn add_waiting_list(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<WaitingListInput>,
) -> Result<Created> {
    let actor = scope.writer()?;
    input.check()?;

    let id = WaitingListService::new(state.db.clone())
        .add_waiting_list(scope.tenant_id, actor, &input)
        .await?;
    Ok(Created(id))
}

pub async fn update_waiting_list(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<WaitingListInput>,
) -> Result<Message> {
    let actor = scope.writer()?;
    let waiting_list_id = scope.uuid("waiting_list_id")?;
    input.check()?;

    WaitingListService::new(state.db.clone())
        .update_waiting_list(scope.tenant_id, waiting_list_id, actor, &input)
        .await?;
    Ok(Message("Waiting list updated successfully"))
}

pub async fn delete_waiting_list(State(state): State<AppState>, scope: Scope) -> Result<NoContent> {
    let actor = scope.writer()?;
    let waiting_list_id = scope.uuid("waiting_list_id")?;

    WaitingListService::new(state.db.clone())
        .delete_waiting_list(scope.tenant_id, waiting_list_id, actor)
        .await?;
    Ok(NoContent)
}

pub async fn get_waiting_list(
    State(state): State<AppState>,
    scope: Scope,
) -> Result<Json<WaitingList>> {
    let waiting_list_id = scope.uuid("waiting_list_id")?;

    let entry = WaitingListService::new(state.db.clone())
        .get_waiting_list(scope.tenant_id, waiting_list_id)
        .await?;
    Ok(Json(entry))
}

pub async fn get_waiting_list_list(
    State(state): State<AppState>,
    scope: Scope,
    Filter(filter): Filter<WaitingListFilter>,
    Paging(page): Paging,
) -> Result<Listed<WaitingList>> {
    let page = WaitingListService::new(state.db.clone())
        .get_waiting_list_list(scope.tenant_id, &filter, page)
        .await?;
    Ok(page.into())
}

/// Move a waiting talent into a batch and close the entry
pub async fn transfer_waiting_list(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<TransferInput>,
) -> Result<Json<EnrolOutcome>> {
    let actor = scope.writer()?;
    let waiting_list_id = scope.uuid("waiting_list_id")?;
    input.check()?;

    let outcome = WaitingListService::new(state.db.clone())
        .transfer_waiting_list(scope.tenant_id, waiting_list_id, actor, &input)
        .await?;
    Ok(Json(outcome))
}
