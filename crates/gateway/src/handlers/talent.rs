//! Talent handlers

use axum::{extract::State, Json};
use talentforge_common::{
    db::models::Talent,
    errors::Result,
    services::{
        talent::{TalentFilter, TalentInput},
        BulkOutcome, TalentService,
    },
    validation::{check_all, Check},
};

use crate::extract::{Filter, JsonBody, LegacyScope, Paging, Scope};
use crate::response::{Created, Listed, Located, Message, NoContent};
use crate::AppState;

pub async fn add_talent(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<TalentInput>,
) -> Result<Created> {
    let actor = scope.writer()?;
    input.check()?;

    let id = TalentService::new(state.db.clone())
        .add_talent(scope.tenant_id, actor, &input)
        .await?;
    Ok(Created(id))
}

/// Older route carrying the caller in the path
pub async fn add_talent_legacy(
    State(state): State<AppState>,
    LegacyScope(scope): LegacyScope,
    JsonBody(input): JsonBody<TalentInput>,
) -> Result<Located> {
    let actor = scope.writer()?;
    input.check()?;

    let id = TalentService::new(state.db.clone())
        .add_talent(scope.tenant_id, actor, &input)
        .await?;

    Ok(Located {
        message: "Talent added successfully",
        location: format!("/tenant/{}/talent/{}", scope.tenant_id, id),
    })
}

/// Every record is checked before any is stored
pub async fn add_talents(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(inputs): JsonBody<Vec<TalentInput>>,
) -> Result<Json<BulkOutcome>> {
    let actor = scope.writer()?;
    check_all(&inputs)?;

    let outcome = TalentService::new(state.db.clone())
        .add_talents(scope.tenant_id, actor, &inputs)
        .await?;
    Ok(Json(outcome))
}

pub async fn update_talent(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<TalentInput>,
) -> Result<Message> {
    let actor = scope.writer()?;
    let talent_id = scope.uuid("talent_id")?;
    input.check()?;

    TalentService::new(state.db.clone())
        .update_talent(scope.tenant_id, talent_id, actor, &input)
        .await?;
    Ok(Message("Talent updated successfully"))
}

pub async fn delete_talent(State(state): State<AppState>, scope: Scope) -> Result<NoContent> {
    let actor = scope.writer()?;
    let talent_id = scope.uuid("talent_id")?;

    TalentService::new(state.db.clone())
        .delete_talent(scope.tenant_id, talent_id, actor)
        .await?;
    Ok(NoContent)
}

pub async fn get_talent(State(state): State<AppState>, scope: Scope) -> Result<Json<Talent>> {
    let talent_id = scope.uuid("talent_id")?;

    let talent = TalentService::new(state.db.clone())
        .get_talent(scope.tenant_id, talent_id)
        .await?;
    Ok(Json(talent))
}

pub async fn get_talent_list(
    State(state): State<AppState>,
    scope: Scope,
    Filter(filter): Filter<TalentFilter>,
    Paging(page): Paging,
) -> Result<Listed<Talent>> {
    let list = TalentService::new(state.db.clone())
        .get_talent_list(scope.tenant_id, &filter, page)
        .await?;

    Ok(Listed::new(list.page).header("x-total-lifetime-value", list.total_lifetime_value))
}
