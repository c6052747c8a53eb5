//! Course module and topic handlers

use axum::{extract::State, Json};
use talentforge_common::{
    db::models::CourseModule,
    errors::Result,
    pagination::Paged,
    services::{
        course::{ModuleFilter, ModuleInput, TopicInput, TopicView},
        CourseService,
    },
    validation::Check,
};

use crate::extract::{Filter, JsonBody, Paging, Scope};
use crate::response::{Created, Listed, Message, NoContent};
use crate::AppState;

pub async fn add_module(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<ModuleInput>,
) -> Result<Created> {
    let actor = scope.writer()?;
    input.check()?;

    let id = CourseService::new(state.db.clone())
        .add_module(scope.tenant_id, actor, &input)
        .await?;
    Ok(Created(id))
}

pub async fn update_module(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<ModuleInput>,
) -> Result<Message> {
    let actor = scope.writer()?;
    let module_id = scope.uuid("module_id")?;
    input.check()?;

    CourseService::new(state.db.clone())
        .update_module(scope.tenant_id, module_id, actor, &input)
        .await?;
    Ok(Message("Module updated successfully"))
}

/// Deleting a module takes its topics with it
pub async fn delete_module(State(state): State<AppState>, scope: Scope) -> Result<NoContent> {
    let actor = scope.writer()?;
    let module_id = scope.uuid("module_id")?;

    CourseService::new(state.db.clone())
        .delete_module(scope.tenant_id, module_id, actor)
        .await?;
    Ok(NoContent)
}

pub async fn get_module(
    State(state): State<AppState>,
    scope: Scope,
) -> Result<Json<CourseModule>> {
    let module_id = scope.uuid("module_id")?;

    let module = CourseService::new(state.db.clone())
        .get_module(scope.tenant_id, module_id)
        .await?;
    Ok(Json(module))
}

pub async fn get_module_list(
    State(state): State<AppState>,
    scope: Scope,
    Filter(filter): Filter<ModuleFilter>,
    Paging(page): Paging,
) -> Result<Listed<CourseModule>> {
    let page = CourseService::new(state.db.clone())
        .get_module_list(scope.tenant_id, &filter, page)
        .await?;
    Ok(page.into())
}

pub async fn add_topic(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<TopicInput>,
) -> Result<Created> {
    let actor = scope.writer()?;
    let module_id = scope.uuid("module_id")?;
    input.check()?;

    let id = CourseService::new(state.db.clone())
        .add_topic(scope.tenant_id, module_id, actor, &input)
        .await?;
    Ok(Created(id))
}

pub async fn update_topic(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<TopicInput>,
) -> Result<Message> {
    let actor = scope.writer()?;
    let module_id = scope.uuid("module_id")?;
    let topic_id = scope.uuid("topic_id")?;
    input.check()?;

    CourseService::new(state.db.clone())
        .update_topic(scope.tenant_id, module_id, topic_id, actor, &input)
        .await?;
    Ok(Message("Topic updated successfully"))
}

pub async fn delete_topic(State(state): State<AppState>, scope: Scope) -> Result<NoContent> {
    let actor = scope.writer()?;
    let module_id = scope.uuid("module_id")?;
    let topic_id = scope.uuid("topic_id")?;

    CourseService::new(state.db.clone())
        .delete_topic(scope.tenant_id, module_id, topic_id, actor)
        .await?;
    Ok(NoContent)
}

/// Topics of a module as a tree, unpaged
pub async fn get_topic_list(
    State(state): State<AppState>,
    scope: Scope,
) -> Result<Listed<TopicView>> {
    let module_id = scope.uuid("module_id")?;

    let topics = CourseService::new(state.db.clone())
        .get_topic_list(scope.tenant_id, module_id)
        .await?;
    let total = topics.len() as u64;
    Ok(Listed::new(Paged::new(topics, total)))
}
