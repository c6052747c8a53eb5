//! Community forum handlers

use axum::{extract::State, Json};
use talentforge_common::{
    db::models::Reply,
    errors::Result,
    services::{
        discussion::{DiscussionFilter, DiscussionInput, DiscussionView, ReplyInput},
        DiscussionService,
    },
    validation::Check,
};

use crate::extract::{Filter, JsonBody, Paging, Scope};
use crate::response::{Created, Listed, Message, NoContent};
use crate::AppState;

pub async fn add_discussion(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<DiscussionInput>,
) -> Result<Created> {
    let actor = scope.writer()?;
    input.check()?;

    let id = DiscussionService::new(state.db.clone())
        .add_discussion(scope.tenant_id, actor, &input)
        .await?;
    Ok(Created(id))
}

pub async fn update_discussion(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<DiscussionInput>,
) -> Result<Message> {
    let actor = scope.writer()?;
    let discussion_id = scope.uuid("discussion_id")?;
    input.check()?;

    DiscussionService::new(state.db.clone())
        .update_discussion(scope.tenant_id, discussion_id, actor, &input)
        .await?;
    Ok(Message("Discussion updated successfully"))
}

pub async fn delete_discussion(State(state): State<AppState>, scope: Scope) -> Result<NoContent> {
    let actor = scope.writer()?;
    let discussion_id = scope.uuid("discussion_id")?;

    DiscussionService::new(state.db.clone())
        .delete_discussion(scope.tenant_id, discussion_id, actor)
        .await?;
    Ok(NoContent)
}

pub async fn get_discussion(
    State(state): State<AppState>,
    scope: Scope,
) -> Result<Json<DiscussionView>> {
    let discussion_id = scope.uuid("discussion_id")?;

    let discussion = DiscussionService::new(state.db.clone())
        .get_discussion(scope.tenant_id, discussion_id)
        .await?;
    Ok(Json(discussion))
}

pub async fn get_discussion_list(
    State(state): State<AppState>,
    scope: Scope,
    Filter(filter): Filter<DiscussionFilter>,
    Paging(page): Paging,
) -> Result<Listed<DiscussionView>> {
    let page = DiscussionService::new(state.db.clone())
        .get_discussion_list(scope.tenant_id, &filter, page)
        .await?;
    Ok(page.into())
}

pub async fn add_reply(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<ReplyInput>,
) -> Result<Created> {
    let actor = scope.writer()?;
    let discussion_id = scope.uuid("discussion_id")?;
    input.check()?;

    let id = DiscussionService::new(state.db.clone())
        .add_reply(scope.tenant_id, discussion_id, actor, &input)
        .await?;
    Ok(Created(id))
}

pub async fn update_reply(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<ReplyInput>,
) -> Result<Message> {
    let actor = scope.writer()?;
    let discussion_id = scope.uuid("discussion_id")?;
    let reply_id = scope.uuid("reply_id")?;
    input.check()?;

    DiscussionService::new(state.db.clone())
        .update_reply(scope.tenant_id, discussion_id, reply_id, actor, &input)
        .await?;
    Ok(Message("Reply updated successfully"))
}

pub async fn delete_reply(State(state): State<AppState>, scope: Scope) -> Result<NoContent> {
    let actor = scope.writer()?;
    let discussion_id = scope.uuid("discussion_id")?;
    let reply_id = scope.uuid("reply_id")?;

    DiscussionService::new(state.db.clone())
        .delete_reply(scope.tenant_id, discussion_id, reply_id, actor)
        .await?;
    Ok(NoContent)
}

/// Replies oldest first
pub async fn get_reply_list(
    State(state): State<AppState>,
    scope: Scope,
    Paging(page): Paging,
) -> Result<Listed<Reply>> {
    let discussion_id = scope.uuid("discussion_id")?;

    let page = DiscussionService::new(state.db.clone())
        .get_reply_list(scope.tenant_id, discussion_id, page)
        .await?;
    Ok(page.into())
}
