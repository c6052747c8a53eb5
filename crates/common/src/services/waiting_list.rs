//! Waiting list entries and their transfer into a batch

use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, QueryFilter, Set};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::db::models::{
    BatchEntity, EnquiryEntity, TalentEntity, WaitingList, WaitingListActiveModel,
    WaitingListColumn, WaitingListEntity,
};
use crate::db::repository::{self, now, TenantScoped};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::metrics::record_mutation;
use crate::pagination::{Page, Paged};
use crate::services::batch::{enrol, EnrolOutcome};
use crate::services::talent::normalize_email;
use crate::validation::{self, Check};

/// An entry refers to exactly one of a talent or an enquiry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitingListInput {
    pub talent_id: Option<Uuid>,
    pub enquiry_id: Option<Uuid>,
    #[serde(default)]
    pub email: String,
    pub batch_id: Option<Uuid>,
    pub course_name: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Check for WaitingListInput {
    fn check(&self) -> Result<()> {
        match (self.talent_id, self.enquiry_id) {
            (Some(id), None) => validation::id("talentId", id)?,
            (None, Some(id)) => validation::id("enquiryId", id)?,
            _ => {
                return Err(AppError::validation(
                    "talentId",
                    "exactly one of talentId and enquiryId must be specified",
                ))
            }
        }
        validation::email("email", &self.email)?;
        if let Some(batch_id) = self.batch_id {
            validation::id("batchId", batch_id)?;
        }
        validation::optional_max("courseName", self.course_name.as_deref(), 100)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferInput {
    #[serde(default)]
    pub batch_id: Uuid,
}

impl Check for TransferInput {
    fn check(&self) -> Result<()> {
        validation::id("batchId", self.batch_id)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitingListFilter {
    pub is_active: Option<bool>,
    pub batch_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct WaitingListService {
    db: DbPool,
}

impl WaitingListService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn add_waiting_list(
        &self,
        tenant_id: Uuid,
        actor: Uuid,
        input: &WaitingListInput,
    ) -> Result<Uuid> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;
        ensure_references(conn, tenant_id, input).await?;

        let entry = WaitingListActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            talent_id: Set(input.talent_id),
            enquiry_id: Set(input.enquiry_id),
            email: Set(normalize_email(&input.email)),
            batch_id: Set(input.batch_id),
            course_name: Set(input.course_name.clone()),
            is_active: Set(input.is_active),
            created_by: Set(actor),
            created_at: Set(now()),
            updated_by: Set(None),
            updated_at: Set(None),
            deleted_by: Set(None),
            deleted_at: Set(None),
        }
        .insert(conn)
        .await?;

        record_mutation("waiting_list", "add");
        info!(tenant_id = %tenant_id, waiting_list_id = %entry.id, "Waiting list entry added");
        Ok(entry.id)
    }

    pub async fn update_waiting_list(
        &self,
        tenant_id: Uuid,
        waiting_list_id: Uuid,
        actor: Uuid,
        input: &WaitingListInput,
    ) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;

        let existing = repository::find::<WaitingListEntity, _>(conn, tenant_id, waiting_list_id).await?;
        ensure_references(conn, tenant_id, input).await?;

        let mut entry: WaitingListActiveModel = existing.into();
        entry.talent_id = Set(input.talent_id);
        entry.enquiry_id = Set(input.enquiry_id);
        entry.email = Set(normalize_email(&input.email));
        entry.batch_id = Set(input.batch_id);
        entry.course_name = Set(input.course_name.clone());
        entry.is_active = Set(input.is_active);
        entry.updated_by = Set(Some(actor));
        entry.updated_at = Set(Some(now()));
        entry.update(conn).await?;

        record_mutation("waiting_list", "update");
        info!(tenant_id = %tenant_id, waiting_list_id = %waiting_list_id, "Waiting list entry updated");
        Ok(())
    }

    pub async fn delete_waiting_list(
        &self,
        tenant_id: Uuid,
        waiting_list_id: Uuid,
        actor: Uuid,
    ) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::soft_delete::<WaitingListEntity, _>(conn, tenant_id, waiting_list_id, actor).await?;

        record_mutation("waiting_list", "delete");
        info!(tenant_id = %tenant_id, waiting_list_id = %waiting_list_id, "Waiting list entry deleted");
        Ok(())
    }

    pub async fn get_waiting_list(&self, tenant_id: Uuid, waiting_list_id: Uuid) -> Result<WaitingList> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::find::<WaitingListEntity, _>(conn, tenant_id, waiting_list_id).await
    }

    pub async fn get_waiting_list_list(
        &self,
        tenant_id: Uuid,
        filter: &WaitingListFilter,
        page: Page,
    ) -> Result<Paged<WaitingList>> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;

        let mut query = WaitingListEntity::scoped(tenant_id);
        if let Some(active) = filter.is_active {
            query = query.filter(WaitingListColumn::IsActive.eq(active));
        }
        if let Some(batch_id) = filter.batch_id {
            query = query.filter(WaitingListColumn::BatchId.eq(batch_id));
        }

        repository::fetch_page(conn, query, page).await
    }

    /// Enrol the waiting talent in a batch and close the entry
    pub async fn transfer_waiting_list(
        &self,
        tenant_id: Uuid,
        waiting_list_id: Uuid,
        actor: Uuid,
        input: &TransferInput,
    ) -> Result<EnrolOutcome> {
        let txn = self.db.begin().await?;
        repository::ensure_tenant(&txn, tenant_id).await?;

        let existing = repository::find::<WaitingListEntity, _>(&txn, tenant_id, waiting_list_id).await?;
        if !existing.is_active {
            return Err(AppError::conflict(format!(
                "waiting list entry {} is no longer active",
                waiting_list_id
            )));
        }
        let talent_id = match existing.talent_id {
            Some(talent_id) => talent_id,
            None => converted_talent(&txn, tenant_id, &existing).await?,
        };

        let outcome = enrol(&txn, tenant_id, input.batch_id, actor, &[talent_id]).await?;

        let mut entry: WaitingListActiveModel = existing.into();
        entry.is_active = Set(false);
        entry.talent_id = Set(Some(talent_id));
        entry.batch_id = Set(Some(input.batch_id));
        entry.updated_by = Set(Some(actor));
        entry.updated_at = Set(Some(now()));
        entry.update(&txn).await?;
        txn.commit().await?;

        record_mutation("waiting_list", "transfer");
        info!(
            tenant_id = %tenant_id,
            waiting_list_id = %waiting_list_id,
            batch_id = %input.batch_id,
            talent_id = %talent_id,
            "Waiting list entry transferred"
        );
        Ok(outcome)
    }
}

/// Talent created from the entry's enquiry; the enquiry must already be converted
async fn converted_talent<C>(conn: &C, tenant_id: Uuid, entry: &WaitingList) -> Result<Uuid>
where
    C: ConnectionTrait,
{
    let not_converted = || {
        AppError::conflict(format!(
            "waiting list entry {} refers to an enquiry; convert it to a talent first",
            entry.id
        ))
    };

    let enquiry_id = entry.enquiry_id.ok_or_else(not_converted)?;
    let enquiry = repository::find::<EnquiryEntity, _>(conn, tenant_id, enquiry_id).await?;
    match enquiry.talent_id {
        Some(talent_id) if enquiry.is_converted => Ok(talent_id),
        _ => Err(not_converted()),
    }
}

/// Referenced talent, enquiry and batch must exist in the tenant
async fn ensure_references<C>(conn: &C, tenant_id: Uuid, input: &WaitingListInput) -> Result<()>
where
    C: ConnectionTrait,
{
    if let Some(talent_id) = input.talent_id {
        repository::ensure_exists::<TalentEntity, _>(conn, tenant_id, talent_id).await?;
    }
    if let Some(enquiry_id) = input.enquiry_id {
        repository::ensure_exists::<EnquiryEntity, _>(conn, tenant_id, enquiry_id).await?;
    }
    if let Some(batch_id) = input.batch_id {
        repository::ensure_exists::<BatchEntity, _>(conn, tenant_id, batch_id).await?;
    }
    Ok(())
}
