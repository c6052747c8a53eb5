//! Enquiry handlers

use axum::{extract::State, Json};
use talentforge_common::{
    db::models::Enquiry,
    errors::Result,
    services::{
        enquiry::{EnquiryFilter, EnquiryInput},
        BulkOutcome, EnquiryService,
    },
    validation::{check_all, Check},
};

use crate::extract::{Filter, JsonBody, Paging, Scope};
use crate::response::{Created, Listed, Message, NoContent};
use crate::AppState;

pub async fn add_enquiry(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<EnquiryInput>,
) -> Result<Created> {
    let actor = scope.writer()?;
    input.check()?;

    let id = EnquiryService::new(state.db.clone())
        .add_enquiry(scope.tenant_id, actor, &input)
        .await?;
    Ok(Created(id))
}

pub async fn add_enquiries(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(inputs): JsonBody<Vec<EnquiryInput>>,
) -> Result<Json<BulkOutcome>> {
    let actor = scope.writer()?;
    check_all(&inputs)?;

    let outcome = EnquiryService::new(state.db.clone())
        .add_enquiries(scope.tenant_id, actor, &inputs)
        .await?;
    Ok(Json(outcome))
}

pub async fn update_enquiry(
    State(state): State<AppState>,
    scope: Scope,
    JsonBody(input): JsonBody<EnquiryInput>,
) -> Result<Message> {
    let actor = scope.writer()?;
    let enquiry_id = scope.uuid("enquiry_id")?;
    input.check()?;

    EnquiryService::new(state.db.clone())
        .update_enquiry(scope.tenant_id, enquiry_id, actor, &input)
        .await?;
    Ok(Message("Enquiry updated successfully"))
}

pub async fn delete_enquiry(State(state): State<AppState>, scope: Scope) -> Result<NoContent> {
    let actor = scope.writer()?;
    let enquiry_id = scope.uuid("enquiry_id")?;

    EnquiryService::new(state.db.clone())
        .delete_enquiry(scope.tenant_id, enquiry_id, actor)
        .await?;
    Ok(NoContent)
}

pub async fn get_enquiry(State(state): State<AppState>, scope: Scope) -> Result<Json<Enquiry>> {
    let enquiry_id = scope.uuid("enquiry_id")?;

    let enquiry = EnquiryService::new(state.db.clone())
        .get_enquiry(scope.tenant_id, enquiry_id)
        .await?;
    Ok(Json(enquiry))
}

pub async fn get_enquiry_list(
    State(state): State<AppState>,
    scope: Scope,
    Filter(filter): Filter<EnquiryFilter>,
    Paging(page): Paging,
) -> Result<Listed<Enquiry>> {
    let page = EnquiryService::new(state.db.clone())
        .get_enquiry_list(scope.tenant_id, &filter, page)
        .await?;
    Ok(Listed::new(page))
}

/// Turn an enquiry into a talent; responds with the talent id
pub async fn convert_enquiry(State(state): State<AppState>, scope: Scope) -> Result<Created> {
    let actor = scope.writer()?;
    let enquiry_id = scope.uuid("enquiry_id")?;

    let talent_id = EnquiryService::new(state.db.clone())
        .convert_enquiry(scope.tenant_id, enquiry_id, actor)
        .await?;
    Ok(Created(talent_id))
}
