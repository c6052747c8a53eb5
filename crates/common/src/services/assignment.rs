//! Batch assignments

use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, QueryFilter, Set};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::db::models::{
    Assignment, AssignmentActiveModel, AssignmentColumn, AssignmentEntity, BatchEntity,
};
use crate::db::repository::{self, now, TenantScoped};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::metrics::record_mutation;
use crate::pagination::{Page, Paged};
use crate::validation::{self, Check};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentInput {
    #[serde(default)]
    pub title: String,
    pub description: Option<String>,
    pub assigned_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub total_score: i32,
}

impl Check for AssignmentInput {
    fn check(&self) -> Result<()> {
        validation::required_max("title", &self.title, 200)?;
        validation::optional_max("description", self.description.as_deref(), 5000)?;
        let (assigned, due) = self.dates()?;
        if due < assigned {
            return Err(AppError::validation("dueDate", "dueDate must not be before assignedDate"));
        }
        validation::range("totalScore", self.total_score, 1, 1000)?;
        Ok(())
    }
}

impl AssignmentInput {
    fn dates(&self) -> Result<(NaiveDate, NaiveDate)> {
        let assigned = self
            .assigned_date
            .ok_or_else(|| AppError::validation("assignedDate", "assignedDate must be specified"))?;
        let due = self
            .due_date
            .ok_or_else(|| AppError::validation("dueDate", "dueDate must be specified"))?;
        Ok((assigned, due))
    }
}

#[derive(Clone)]
pub struct AssignmentService {
    db: DbPool,
}

impl AssignmentService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn add_assignment(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        actor: Uuid,
        input: &AssignmentInput,
    ) -> Result<Uuid> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::ensure_exists::<BatchEntity, _>(conn, tenant_id, batch_id).await?;

        let (assigned, due) = input.dates()?;
        let assignment = AssignmentActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            batch_id: Set(batch_id),
            title: Set(input.title.trim().to_string()),
            description: Set(input.description.clone()),
            assigned_date: Set(assigned),
            due_date: Set(due),
            total_score: Set(input.total_score),
            created_by: Set(actor),
            created_at: Set(now()),
            updated_by: Set(None),
            updated_at: Set(None),
            deleted_by: Set(None),
            deleted_at: Set(None),
        }
        .insert(conn)
        .await?;

        record_mutation("assignment", "add");
        info!(
            tenant_id = %tenant_id,
            batch_id = %batch_id,
            assignment_id = %assignment.id,
            "Assignment added"
        );
        Ok(assignment.id)
    }

    pub async fn update_assignment(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        assignment_id: Uuid,
        actor: Uuid,
        input: &AssignmentInput,
    ) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;

        let existing = find_assignment(conn, tenant_id, batch_id, assignment_id).await?;
        let (assigned, due) = input.dates()?;

        let mut assignment: AssignmentActiveModel = existing.into();
        assignment.title = Set(input.title.trim().to_string());
        assignment.description = Set(input.description.clone());
        assignment.assigned_date = Set(assigned);
        assignment.due_date = Set(due);
        assignment.total_score = Set(input.total_score);
        assignment.updated_by = Set(Some(actor));
        assignment.updated_at = Set(Some(now()));
        assignment.update(conn).await?;

        record_mutation("assignment", "update");
        info!(tenant_id = %tenant_id, assignment_id = %assignment_id, "Assignment updated");
        Ok(())
    }

    pub async fn delete_assignment(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        assignment_id: Uuid,
        actor: Uuid,
    ) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;
        find_assignment(conn, tenant_id, batch_id, assignment_id).await?;
        repository::soft_delete::<AssignmentEntity, _>(conn, tenant_id, assignment_id, actor).await?;

        record_mutation("assignment", "delete");
        info!(tenant_id = %tenant_id, assignment_id = %assignment_id, "Assignment deleted");
        Ok(())
    }

    pub async fn get_assignment(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        assignment_id: Uuid,
    ) -> Result<Assignment> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;
        find_assignment(conn, tenant_id, batch_id, assignment_id).await
    }

    pub async fn get_assignment_list(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        page: Page,
    ) -> Result<Paged<Assignment>> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::ensure_exists::<BatchEntity, _>(conn, tenant_id, batch_id).await?;

        let query = AssignmentEntity::scoped(tenant_id).filter(AssignmentColumn::BatchId.eq(batch_id));
        repository::fetch_page(conn, query, page).await
    }
}

async fn find_assignment<C>(
    conn: &C,
    tenant_id: Uuid,
    batch_id: Uuid,
    assignment_id: Uuid,
) -> Result<Assignment>
where
    C: ConnectionTrait,
{
    let assignment = repository::find::<AssignmentEntity, _>(conn, tenant_id, assignment_id).await?;
    if assignment.batch_id != batch_id {
        return Err(AppError::not_found("assignment", assignment_id));
    }
    Ok(assignment)
}
