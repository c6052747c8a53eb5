//! Session feedback handlers

use axum::extract::State;
use talentforge_common::{
    errors::Result,
    services::{
        feedback::{FeedbackInput, FeedbackUpdateInput, FeedbackView},
        FeedbackService,
    },
    validation::Check,
};

use crate::extract::{JsonBody, Paging, Scope};
use crate::response::{Created, Listed, Message, NoContent};
use crate::AppState;

pub async fn add_feedback(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<FeedbackInput>,
) -> Result<Created> {
    let actor = scope.writer()?;
    let batch_id = scope.uuid("batch_id")?;
    let session_id = scope.uuid("session_id")?;
    input.check()?;

    let id = FeedbackService::new(state.db.clone())
        .add_feedback(scope.tenant_id, batch_id, session_id, actor, &input)
        .await?;
    Ok(Created(id))
}

pub async fn update_feedback(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<FeedbackUpdateInput>,
) -> Result<Message> {
    let actor = scope.writer()?;
    let batch_id = scope.uuid("batch_id")?;
    let session_id = scope.uuid("session_id")?;
    let feedback_id = scope.uuid("feedback_id")?;
    input.check()?;

    FeedbackService::new(state.db.clone())
        .update_feedback(scope.tenant_id, batch_id, session_id, feedback_id, actor, &input)
        .await?;
    Ok(Message("Feedback updated successfully"))
}

pub async fn delete_feedback(State(state): State<AppState>, scope: Scope) -> Result<NoContent> {
    let actor = scope.writer()?;
    let batch_id = scope.uuid("batch_id")?;
    let session_id = scope.uuid("session_id")?;
    let feedback_id = scope.uuid("feedback_id")?;

    FeedbackService::new(state.db.clone())
        .delete_feedback(scope.tenant_id, batch_id, session_id, feedback_id, actor)
        .await?;
    Ok(NoContent)
}

/// Feedback of a session; `X-Average-Score` is omitted when there is none
pub async fn get_feedback_list(
    State(state): State<AppState>,
    scope: Scope,
    Paging(page): Paging,
) -> Result<Listed<FeedbackView>> {
    let batch_id = scope.uuid("batch_id")?;
    let session_id = scope.uuid("session_id")?;

    let list = FeedbackService::new(state.db.clone())
        .get_feedback_list(scope.tenant_id, batch_id, session_id, page)
        .await?;

    let listed = Listed::new(list.page);
    Ok(match list.average_score {
        Some(average) => listed.header("x-average-score", average),
        None => listed,
    })
}
