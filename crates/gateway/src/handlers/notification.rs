//! Notification handlers
//!
//! Lists and the seen flag are always about the caller's own inbox.

use axum::extract::State;
use talentforge_common::{
    db::models::Notification,
    errors::Result,
    services::{
        notification::{NotificationFilter, NotificationInput},
        NotificationService,
    },
    validation::Check,
};

use crate::extract::{Filter, JsonBody, Paging, Scope};
use crate::response::{Created, Listed, Message, NoContent};
use crate::AppState;

pub async fn add_notification(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<NotificationInput>,
) -> Result<Created> {
    let actor = scope.writer()?;
    input.check()?;

    let id = NotificationService::new(state.db.clone())
        .add_notification(scope.tenant_id, actor, &input)
        .await?;
    Ok(Created(id))
}

/// Only the recipient may mark a notification; no write scope needed
pub async fn mark_notification_seen(
    State(state): State<AppState>,
    scope: Scope,
) -> Result<Message> {
    let notification_id = scope.uuid("notification_id")?;

    NotificationService::new(state.db.clone())
        .mark_notification_seen(scope.tenant_id, notification_id, scope.caller.credential_id)
        .await?;
    Ok(Message("Notification marked as seen"))
}

pub async fn delete_notification(State(state): State<AppState>, scope: Scope) -> Result<NoContent> {
    let actor = scope.writer()?;
    let notification_id = scope.uuid("notification_id")?;

    NotificationService::new(state.db.clone())
        .delete_notification(scope.tenant_id, notification_id, actor)
        .await?;
    Ok(NoContent)
}

pub async fn get_notification_list(
    State(state): State<AppState>,
    scope: Scope,
    Filter(filter): Filter<NotificationFilter>,
    Paging(page): Paging,
) -> Result<Listed<Notification>> {
    let list = NotificationService::new(state.db.clone())
        .get_notification_list(scope.tenant_id, scope.caller.credential_id, &filter, page)
        .await?;
    Ok(Listed::new(list.page).header("x-unseen-count", list.unseen_count))
}
