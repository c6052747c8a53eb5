//! Talent interviews

use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, QueryFilter, Set};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::db::models::{
    Interview, InterviewActiveModel, InterviewColumn, InterviewEntity, InterviewStatus,
    TalentEntity,
};
use crate::db::repository::{self, now, TenantScoped};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::metrics::record_mutation;
use crate::pagination::{Page, Paged};
use crate::validation::{self, Check};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewInput {
    pub scheduled_date: Option<NaiveDate>,
    pub interviewer: Option<String>,
    #[serde(default)]
    pub status: String,
    pub rating: Option<i32>,
    pub comment: Option<String>,
}

impl Check for InterviewInput {
    /// A rating belongs to completed interviews only, and they must have one
    fn check(&self) -> Result<()> {
        if self.scheduled_date.is_none() {
            return Err(AppError::validation("scheduledDate", "scheduledDate must be specified"));
        }
        validation::optional_max("interviewer", self.interviewer.as_deref(), 100)?;
        let status = validation::one_of::<InterviewStatus>("status", &self.status)?;
        match (status, self.rating) {
            (InterviewStatus::Completed, Some(rating)) => validation::range("rating", rating, 1, 5)?,
            (InterviewStatus::Completed, None) => {
                return Err(AppError::validation(
                    "rating",
                    "rating must be specified for a completed interview",
                ))
            }
            (_, Some(_)) => {
                return Err(AppError::validation(
                    "rating",
                    "rating is only allowed for a completed interview",
                ))
            }
            (_, None) => {}
        }
        validation::optional_max("comment", self.comment.as_deref(), 1000)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterviewFilter {
    pub status: Option<InterviewStatus>,
}

#[derive(Clone)]
pub struct InterviewService {
    db: DbPool,
}

impl InterviewService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn add_interview(
        &self,
        tenant_id: Uuid,
        talent_id: Uuid,
        actor: Uuid,
        input: &InterviewInput,
    ) -> Result<Uuid> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::ensure_exists::<TalentEntity, _>(conn, tenant_id, talent_id).await?;

        let scheduled_date = scheduled(input)?;
        let interview = InterviewActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            talent_id: Set(talent_id),
            scheduled_date: Set(scheduled_date),
            interviewer: Set(input.interviewer.clone()),
            status: Set(input.status.clone()),
            rating: Set(input.rating),
            comment: Set(input.comment.clone()),
            created_by: Set(actor),
            created_at: Set(now()),
            updated_by: Set(None),
            updated_at: Set(None),
            deleted_by: Set(None),
            deleted_at: Set(None),
        }
        .insert(conn)
        .await?;

        record_mutation("interview", "add");
        info!(
            tenant_id = %tenant_id,
            talent_id = %talent_id,
            interview_id = %interview.id,
            "Interview added"
        );
        Ok(interview.id)
    }

    pub async fn update_interview(
        &self,
        tenant_id: Uuid,
        talent_id: Uuid,
        interview_id: Uuid,
        actor: Uuid,
        input: &InterviewInput,
    ) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;

        let existing = find_interview(conn, tenant_id, talent_id, interview_id).await?;
        let mut interview: InterviewActiveModel = existing.into();
        interview.scheduled_date = Set(scheduled(input)?);
        interview.interviewer = Set(input.interviewer.clone());
        interview.status = Set(input.status.clone());
        interview.rating = Set(input.rating);
        interview.comment = Set(input.comment.clone());
        interview.updated_by = Set(Some(actor));
        interview.updated_at = Set(Some(now()));
        interview.update(conn).await?;

        record_mutation("interview", "update");
        info!(tenant_id = %tenant_id, interview_id = %interview_id, status = %input.status, "Interview updated");
        Ok(())
    }

    pub async fn delete_interview(
        &self,
        tenant_id: Uuid,
        talent_id: Uuid,
        interview_id: Uuid,
        actor: Uuid,
    ) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;
        find_interview(conn, tenant_id, talent_id, interview_id).await?;
        repository::soft_delete::<InterviewEntity, _>(conn, tenant_id, interview_id, actor).await?;

        record_mutation("interview", "delete");
        info!(tenant_id = %tenant_id, interview_id = %interview_id, "Interview deleted");
        Ok(())
    }

    pub async fn get_interview(
        &self,
        tenant_id: Uuid,
        talent_id: Uuid,
        interview_id: Uuid,
    ) -> Result<Interview> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;
        find_interview(conn, tenant_id, talent_id, interview_id).await
    }

    pub async fn get_interview_list(
        &self,
        tenant_id: Uuid,
        talent_id: Uuid,
        filter: &InterviewFilter,
        page: Page,
    ) -> Result<Paged<Interview>> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::ensure_exists::<TalentEntity, _>(conn, tenant_id, talent_id).await?;

        let mut query = InterviewEntity::scoped(tenant_id).filter(InterviewColumn::TalentId.eq(talent_id));
        if let Some(status) = filter.status {
            query = query.filter(InterviewColumn::Status.eq(status.as_str()));
        }

        repository::fetch_page(conn, query, page).await
    }
}

fn scheduled(input: &InterviewInput) -> Result<NaiveDate> {
    input
        .scheduled_date
        .ok_or_else(|| AppError::validation("scheduledDate", "scheduledDate must be specified"))
}

async fn find_interview<C>(
    conn: &C,
    tenant_id: Uuid,
    talent_id: Uuid,
    interview_id: Uuid,
) -> Result<Interview>
where
    C: ConnectionTrait,
{
    let interview = repository::find::<InterviewEntity, _>(conn, tenant_id, interview_id).await?;
    if interview.talent_id != talent_id {
        return Err(AppError::not_found("interview", interview_id));
    }
    Ok(interview)
}
