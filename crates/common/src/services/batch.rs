//! Batch service: batches, their weekly schedule, memberships and modules

use chrono::{NaiveDate, NaiveTime, Weekday};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;
use uuid::Uuid;

use crate::db::models::{
    Batch, BatchActiveModel, BatchColumn, BatchEntity, BatchModuleActiveModel, BatchModuleColumn,
    BatchModuleEntity, BatchSessionColumn, BatchSessionEntity, BatchStatus, BatchTalentActiveModel,
    BatchTalentColumn, BatchTalentEntity, BatchTiming, BatchTimingActiveModel, BatchTimingColumn,
    BatchTimingEntity, CourseModuleColumn, CourseModuleEntity, SessionTopicColumn,
    SessionTopicEntity, TalentColumn, TalentEntity,
};
use crate::db::repository::{self, now, TenantScoped};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::metrics::record_mutation;
use crate::pagination::{Page, Paged};
use crate::services::search_condition;
use crate::validation::{self, Check};

// ============================================================================
// Input
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub course_name: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub total_intake: i32,
    #[serde(default)]
    pub status: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub timings: Vec<TimingInput>,
}

fn default_active() -> bool {
    true
}

/// One weekly slot, e.g. `{"day": "monday", "fromTime": "09:00", "toTime": "11:00"}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingInput {
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub from_time: String,
    #[serde(default)]
    pub to_time: String,
}

impl TimingInput {
    pub fn parse(&self) -> Result<(Weekday, NaiveTime, NaiveTime)> {
        let day = validation::weekday("day", &self.day)?;
        let from = validation::time_of_day("fromTime", &self.from_time)?;
        let to = validation::time_of_day("toTime", &self.to_time)?;
        if from >= to {
            return Err(AppError::validation("toTime", "toTime must be after fromTime"));
        }
        Ok((day, from, to))
    }
}

impl Check for BatchInput {
    fn check(&self) -> Result<()> {
        validation::required_max("name", &self.name, 100)?;
        validation::required_max("courseName", &self.course_name, 100)?;
        let start = self
            .start_date
            .ok_or_else(|| AppError::validation("startDate", "startDate must be specified"))?;
        if let Some(end) = self.end_date {
            validation::ordered_dates("startDate", start, "endDate", end)?;
        }
        validation::range("totalIntake", self.total_intake, 1, 500)?;
        validation::one_of::<BatchStatus>("status", &self.status)?;

        if self.timings.is_empty() {
            return Err(AppError::validation("timings", "timings must have at least one entry"));
        }
        let mut days = HashSet::new();
        for timing in &self.timings {
            let (day, _, _) = timing.parse()?;
            if !days.insert(day) {
                return Err(AppError::validation(
                    "timings",
                    format!("timings repeat {}", weekday_name(day)),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchFilter {
    pub search: Option<String>,
    pub status: Option<BatchStatus>,
    pub is_active: Option<bool>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

/// Talents to enrol in a batch
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolInput {
    #[serde(default)]
    pub talent_ids: Vec<Uuid>,
}

impl Check for EnrolInput {
    fn check(&self) -> Result<()> {
        if self.talent_ids.is_empty() {
            return Err(AppError::validation("talentIds", "talentIds must be specified"));
        }
        for id in &self.talent_ids {
            validation::id("talentIds", *id)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleOrderInput {
    pub module_id: Uuid,
    pub order: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignModulesInput {
    #[serde(default)]
    pub modules: Vec<ModuleOrderInput>,
}

impl Check for AssignModulesInput {
    fn check(&self) -> Result<()> {
        if self.modules.is_empty() {
            return Err(AppError::validation("modules", "modules must be specified"));
        }
        let mut ids = HashSet::new();
        let mut orders = HashSet::new();
        for module in &self.modules {
            validation::id("moduleId", module.module_id)?;
            validation::range("order", module.order, 1, 1000)?;
            if !ids.insert(module.module_id) {
                return Err(AppError::validation("moduleId", "moduleId must not repeat"));
            }
            if !orders.insert(module.order) {
                return Err(AppError::validation("order", "order must not repeat"));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingView {
    pub day: &'static str,
    pub from_time: String,
    pub to_time: String,
}

impl From<&BatchTiming> for TimingView {
    fn from(timing: &BatchTiming) -> Self {
        let day = u8::try_from(timing.day_of_week)
            .ok()
            .and_then(|n| Weekday::try_from(n).ok())
            .map(weekday_name)
            .unwrap_or("unknown");

        Self {
            day,
            from_time: timing.from_time.format("%H:%M").to_string(),
            to_time: timing.to_time.format("%H:%M").to_string(),
        }
    }
}

/// Batch with its schedule and head count
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDetail {
    #[serde(flatten)]
    pub batch: Batch,
    pub timings: Vec<TimingView>,
    pub active_talent_count: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EnrolOutcome {
    pub added_count: usize,
    pub skipped_count: usize,
}

/// Membership joined with the talent it refers to
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTalentView {
    pub talent_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub date_of_joining: NaiveDate,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct BatchTalentList {
    pub page: Paged<BatchTalentView>,
    pub active_talents: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchModuleView {
    pub module_id: Uuid,
    pub name: String,
    pub order: i32,
}

// ============================================================================
// Service
// ============================================================================

#[derive(Clone)]
pub struct BatchService {
    db: DbPool,
}

impl BatchService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Add a batch together with its weekly schedule
    pub async fn add_batch(
        &self,
        tenant_id: Uuid,
        actor: Uuid,
        input: &BatchInput,
    ) -> Result<Uuid> {
        let txn = self.db.begin().await?;
        repository::ensure_tenant(&txn, tenant_id).await?;

        let start_date = input
            .start_date
            .ok_or_else(|| AppError::validation("startDate", "startDate must be specified"))?;

        let batch = BatchActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            name: Set(input.name.trim().to_string()),
            course_name: Set(input.course_name.trim().to_string()),
            start_date: Set(start_date),
            end_date: Set(input.end_date),
            total_intake: Set(input.total_intake),
            status: Set(input.status.clone()),
            is_active: Set(input.is_active),
            created_by: Set(actor),
            created_at: Set(now()),
            updated_by: Set(None),
            updated_at: Set(None),
            deleted_by: Set(None),
            deleted_at: Set(None),
        }
        .insert(&txn)
        .await?;

        insert_timings(&txn, tenant_id, batch.id, actor, &input.timings).await?;
        txn.commit().await?;

        record_mutation("batch", "add");
        info!(tenant_id = %tenant_id, batch_id = %batch.id, "Batch added");
        Ok(batch.id)
    }

    /// Update a batch and replace its weekly schedule
    pub async fn update_batch(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        actor: Uuid,
        input: &BatchInput,
    ) -> Result<()> {
        let txn = self.db.begin().await?;
        repository::ensure_tenant(&txn, tenant_id).await?;

        let existing = repository::find::<BatchEntity, _>(&txn, tenant_id, batch_id).await?;

        let enrolled = active_member_count(&txn, tenant_id, batch_id).await?;
        if u64::try_from(input.total_intake).unwrap_or(0) < enrolled {
            return Err(AppError::conflict(format!(
                "totalIntake {} is below the {} talents already enrolled",
                input.total_intake, enrolled
            )));
        }

        let mut batch: BatchActiveModel = existing.into();
        batch.name = Set(input.name.trim().to_string());
        batch.course_name = Set(input.course_name.trim().to_string());
        if let Some(start) = input.start_date {
            batch.start_date = Set(start);
        }
        batch.end_date = Set(input.end_date);
        batch.total_intake = Set(input.total_intake);
        batch.status = Set(input.status.clone());
        batch.is_active = Set(input.is_active);
        batch.updated_by = Set(Some(actor));
        batch.updated_at = Set(Some(now()));
        batch.update(&txn).await?;

        repository::soft_delete_where::<BatchTimingEntity, _, _>(
            &txn,
            tenant_id,
            BatchTimingColumn::BatchId.eq(batch_id),
            actor,
        )
        .await?;
        insert_timings(&txn, tenant_id, batch_id, actor, &input.timings).await?;
        txn.commit().await?;

        record_mutation("batch", "update");
        info!(tenant_id = %tenant_id, batch_id = %batch_id, "Batch updated");
        Ok(())
    }

    /// Soft-delete a batch with its schedule, memberships, modules and plan
    pub async fn delete_batch(&self, tenant_id: Uuid, batch_id: Uuid, actor: Uuid) -> Result<()> {
        let txn = self.db.begin().await?;
        repository::ensure_tenant(&txn, tenant_id).await?;

        repository::soft_delete::<BatchEntity, _>(&txn, tenant_id, batch_id, actor).await?;
        repository::soft_delete_where::<BatchTimingEntity, _, _>(
            &txn,
            tenant_id,
            BatchTimingColumn::BatchId.eq(batch_id),
            actor,
        )
        .await?;
        repository::soft_delete_where::<BatchTalentEntity, _, _>(
            &txn,
            tenant_id,
            BatchTalentColumn::BatchId.eq(batch_id),
            actor,
        )
        .await?;
        repository::soft_delete_where::<BatchModuleEntity, _, _>(
            &txn,
            tenant_id,
            BatchModuleColumn::BatchId.eq(batch_id),
            actor,
        )
        .await?;
        repository::soft_delete_where::<SessionTopicEntity, _, _>(
            &txn,
            tenant_id,
            SessionTopicColumn::BatchId.eq(batch_id),
            actor,
        )
        .await?;
        repository::soft_delete_where::<BatchSessionEntity, _, _>(
            &txn,
            tenant_id,
            BatchSessionColumn::BatchId.eq(batch_id),
            actor,
        )
        .await?;
        txn.commit().await?;

        record_mutation("batch", "delete");
        info!(tenant_id = %tenant_id, batch_id = %batch_id, "Batch deleted");
        Ok(())
    }

    pub async fn get_batch(&self, tenant_id: Uuid, batch_id: Uuid) -> Result<BatchDetail> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;

        let batch = repository::find::<BatchEntity, _>(conn, tenant_id, batch_id).await?;
        let timings = timings_of(conn, tenant_id, batch_id).await?;
        let active_talent_count = active_member_count(conn, tenant_id, batch_id).await?;

        Ok(BatchDetail {
            batch,
            timings: timings.iter().map(TimingView::from).collect(),
            active_talent_count,
        })
    }

    pub async fn get_batch_list(
        &self,
        tenant_id: Uuid,
        filter: &BatchFilter,
        page: Page,
    ) -> Result<Paged<Batch>> {
        if let (Some(from), Some(to)) = (filter.date_from, filter.date_to) {
            if from > to {
                return Err(AppError::validation("dateTo", "dateTo must not be before dateFrom"));
            }
        }

        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;

        let mut query = BatchEntity::scoped(tenant_id);
        if let Some(ref term) = filter.search {
            query = query.filter(search_condition(
                &[BatchColumn::Name, BatchColumn::CourseName],
                term,
            ));
        }
        if let Some(status) = filter.status {
            query = query.filter(BatchColumn::Status.eq(status.as_str()));
        }
        if let Some(active) = filter.is_active {
            query = query.filter(BatchColumn::IsActive.eq(active));
        }
        if let Some(from) = filter.date_from {
            query = query.filter(BatchColumn::StartDate.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(BatchColumn::StartDate.lte(to));
        }

        repository::fetch_page(conn, query, page).await
    }

    // ------------------------------------------------------------------------
    // Memberships
    // ------------------------------------------------------------------------

    /// Enrol talents; existing members are skipped, capacity is enforced
    pub async fn add_talents_to_batch(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        actor: Uuid,
        talent_ids: &[Uuid],
    ) -> Result<EnrolOutcome> {
        let txn = self.db.begin().await?;
        repository::ensure_tenant(&txn, tenant_id).await?;

        let outcome = enrol(&txn, tenant_id, batch_id, actor, talent_ids).await?;
        txn.commit().await?;

        record_mutation("batch_talent", "add");
        info!(
            tenant_id = %tenant_id,
            batch_id = %batch_id,
            added = outcome.added_count,
            skipped = outcome.skipped_count,
            "Talents enrolled in batch"
        );
        Ok(outcome)
    }

    pub async fn remove_talent_from_batch(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        talent_id: Uuid,
        actor: Uuid,
    ) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::ensure_exists::<BatchEntity, _>(conn, tenant_id, batch_id).await?;

        let removed = repository::soft_delete_where::<BatchTalentEntity, _, _>(
            conn,
            tenant_id,
            BatchTalentColumn::BatchId
                .eq(batch_id)
                .and(BatchTalentColumn::TalentId.eq(talent_id)),
            actor,
        )
        .await?;
        if removed == 0 {
            return Err(AppError::not_found("batch talent", talent_id));
        }

        record_mutation("batch_talent", "delete");
        info!(
            tenant_id = %tenant_id,
            batch_id = %batch_id,
            talent_id = %talent_id,
            "Talent removed from batch"
        );
        Ok(())
    }

    pub async fn get_batch_talent_list(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        page: Page,
    ) -> Result<BatchTalentList> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::ensure_exists::<BatchEntity, _>(conn, tenant_id, batch_id).await?;

        let query =
            BatchTalentEntity::scoped(tenant_id).filter(BatchTalentColumn::BatchId.eq(batch_id));
        let memberships = repository::fetch_page(conn, query, page).await?;

        let ids: Vec<Uuid> = memberships.items.iter().map(|m| m.talent_id).collect();
        let talents: HashMap<Uuid, _> = TalentEntity::scoped(tenant_id)
            .filter(TalentColumn::Id.is_in(ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();

        let items = memberships
            .items
            .into_iter()
            .filter_map(|membership| {
                talents.get(&membership.talent_id).map(|talent| BatchTalentView {
                    talent_id: talent.id,
                    first_name: talent.first_name.clone(),
                    last_name: talent.last_name.clone(),
                    email: talent.email.clone(),
                    date_of_joining: membership.date_of_joining,
                    is_active: membership.is_active,
                })
            })
            .collect();

        Ok(BatchTalentList {
            page: Paged::new(items, memberships.total),
            active_talents: active_member_count(conn, tenant_id, batch_id).await?,
        })
    }

    // ------------------------------------------------------------------------
    // Modules
    // ------------------------------------------------------------------------

    /// Replace the ordered module list of a batch
    pub async fn assign_batch_modules(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        actor: Uuid,
        input: &AssignModulesInput,
    ) -> Result<usize> {
        let txn = self.db.begin().await?;
        repository::ensure_tenant(&txn, tenant_id).await?;
        repository::ensure_exists::<BatchEntity, _>(&txn, tenant_id, batch_id).await?;

        for module in &input.modules {
            repository::ensure_exists::<CourseModuleEntity, _>(&txn, tenant_id, module.module_id)
                .await?;
        }

        repository::soft_delete_where::<BatchModuleEntity, _, _>(
            &txn,
            tenant_id,
            BatchModuleColumn::BatchId.eq(batch_id),
            actor,
        )
        .await?;

        for module in &input.modules {
            BatchModuleActiveModel {
                id: Set(Uuid::new_v4()),
                tenant_id: Set(tenant_id),
                batch_id: Set(batch_id),
                module_id: Set(module.module_id),
                module_order: Set(module.order),
                created_by: Set(actor),
                created_at: Set(now()),
                updated_by: Set(None),
                updated_at: Set(None),
                deleted_by: Set(None),
                deleted_at: Set(None),
            }
            .insert(&txn)
            .await?;
        }
        txn.commit().await?;

        record_mutation("batch_module", "assign");
        info!(
            tenant_id = %tenant_id,
            batch_id = %batch_id,
            modules = input.modules.len(),
            "Batch modules assigned"
        );
        Ok(input.modules.len())
    }

    pub async fn get_batch_module_list(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
    ) -> Result<Vec<BatchModuleView>> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::ensure_exists::<BatchEntity, _>(conn, tenant_id, batch_id).await?;

        let assigned = BatchModuleEntity::scoped(tenant_id)
            .filter(BatchModuleColumn::BatchId.eq(batch_id))
            .order_by_asc(BatchModuleColumn::ModuleOrder)
            .all(conn)
            .await?;

        let ids: Vec<Uuid> = assigned.iter().map(|a| a.module_id).collect();
        let names: HashMap<Uuid, String> = CourseModuleEntity::scoped(tenant_id)
            .filter(CourseModuleColumn::Id.is_in(ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|m| (m.id, m.name))
            .collect();

        Ok(assigned
            .into_iter()
            .filter_map(|a| {
                names.get(&a.module_id).map(|name| BatchModuleView {
                    module_id: a.module_id,
                    name: name.clone(),
                    order: a.module_order,
                })
            })
            .collect())
    }
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Enrol talents in a batch on an open connection or transaction
///
/// Every talent must exist in the tenant. Talents already enrolled are
/// skipped. Fails with a conflict when the new members would exceed the
/// batch intake.
pub(crate) async fn enrol<C>(
    conn: &C,
    tenant_id: Uuid,
    batch_id: Uuid,
    actor: Uuid,
    talent_ids: &[Uuid],
) -> Result<EnrolOutcome>
where
    C: ConnectionTrait,
{
    let batch = repository::find::<BatchEntity, _>(conn, tenant_id, batch_id).await?;

    let mut requested = Vec::new();
    for id in talent_ids {
        if !requested.contains(id) {
            repository::ensure_exists::<TalentEntity, _>(conn, tenant_id, *id).await?;
            requested.push(*id);
        }
    }

    let enrolled: HashSet<Uuid> = BatchTalentEntity::scoped(tenant_id)
        .filter(BatchTalentColumn::BatchId.eq(batch_id))
        .filter(BatchTalentColumn::IsActive.eq(true))
        .all(conn)
        .await?
        .into_iter()
        .map(|m| m.talent_id)
        .collect();

    let new: Vec<Uuid> = requested.iter().copied().filter(|id| !enrolled.contains(id)).collect();
    let capacity = usize::try_from(batch.total_intake).unwrap_or(0);
    if enrolled.len() + new.len() > capacity {
        return Err(AppError::conflict(format!(
            "batch capacity of {} exceeded: {} enrolled, {} requested",
            batch.total_intake,
            enrolled.len(),
            new.len()
        )));
    }

    let today = now().date_naive();
    for talent_id in &new {
        BatchTalentActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            batch_id: Set(batch_id),
            talent_id: Set(*talent_id),
            date_of_joining: Set(today),
            is_active: Set(true),
            created_by: Set(actor),
            created_at: Set(now()),
            updated_by: Set(None),
            updated_at: Set(None),
            deleted_by: Set(None),
            deleted_at: Set(None),
        }
        .insert(conn)
        .await?;
    }

    Ok(EnrolOutcome {
        added_count: new.len(),
        skipped_count: talent_ids.len() - new.len(),
    })
}

/// Live weekly slots of a batch, Monday first
pub(crate) async fn timings_of<C>(
    conn: &C,
    tenant_id: Uuid,
    batch_id: Uuid,
) -> Result<Vec<BatchTiming>>
where
    C: ConnectionTrait,
{
    BatchTimingEntity::scoped(tenant_id)
        .filter(BatchTimingColumn::BatchId.eq(batch_id))
        .order_by_asc(BatchTimingColumn::DayOfWeek)
        .all(conn)
        .await
        .map_err(Into::into)
}

/// Whether `talent_id` is an active member of the batch
pub(crate) async fn is_active_member<C>(
    conn: &C,
    tenant_id: Uuid,
    batch_id: Uuid,
    talent_id: Uuid,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let count = BatchTalentEntity::scoped(tenant_id)
        .filter(BatchTalentColumn::BatchId.eq(batch_id))
        .filter(BatchTalentColumn::TalentId.eq(talent_id))
        .filter(BatchTalentColumn::IsActive.eq(true))
        .count(conn)
        .await?;
    Ok(count > 0)
}

async fn active_member_count<C>(conn: &C, tenant_id: Uuid, batch_id: Uuid) -> Result<u64>
where
    C: ConnectionTrait,
{
    BatchTalentEntity::scoped(tenant_id)
        .filter(BatchTalentColumn::BatchId.eq(batch_id))
        .filter(BatchTalentColumn::IsActive.eq(true))
        .count(conn)
        .await
        .map_err(Into::into)
}

async fn insert_timings<C>(
    conn: &C,
    tenant_id: Uuid,
    batch_id: Uuid,
    actor: Uuid,
    timings: &[TimingInput],
) -> Result<()>
where
    C: ConnectionTrait,
{
    for timing in timings {
        let (day, from, to) = timing.parse()?;
        BatchTimingActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            batch_id: Set(batch_id),
            day_of_week: Set(day.num_days_from_monday() as i32),
            from_time: Set(from),
            to_time: Set(to),
            created_by: Set(actor),
            created_at: Set(now()),
            updated_by: Set(None),
            updated_at: Set(None),
            deleted_by: Set(None),
            deleted_at: Set(None),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

pub(crate) fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::talent::{TalentInput, TalentService};
    use crate::services::testing::setup;

    fn batch(intake: i32) -> BatchInput {
        BatchInput {
            name: "Rust Cohort 1".to_string(),
            course_name: "Systems Programming".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 30),
            total_intake: intake,
            status: "upcoming".to_string(),
            is_active: true,
            timings: vec![TimingInput {
                day: "monday".to_string(),
                from_time: "09:00".to_string(),
                to_time: "11:00".to_string(),
            }],
        }
    }

    async fn talents(service: &TalentService, tenant_id: Uuid, n: usize) -> Vec<Uuid> {
        let mut ids = Vec::new();
        for i in 0..n {
            let input = TalentInput {
                first_name: "Asha".to_string(),
                last_name: "Rao".to_string(),
                email: format!("t{}@x.com", i),
                contact: "9876543210".to_string(),
                academic_year: "graduate".to_string(),
                is_active: true,
                ..Default::default()
            };
            ids.push(service.add_talent(tenant_id, Uuid::new_v4(), &input).await.unwrap());
        }
        ids
    }

    #[test]
    fn test_check_timings() {
        let mut input = batch(10);
        assert!(input.check().is_ok());

        input.timings[0].to_time = "08:00".to_string();
        assert_eq!(input.check().unwrap_err().to_string(), "toTime must be after fromTime");

        input.timings[0].to_time = "11:00".to_string();
        input.timings.push(input.timings[0].clone());
        assert_eq!(input.check().unwrap_err().to_string(), "timings repeat monday");

        input.timings.clear();
        assert!(input.check().is_err());
    }

    #[test]
    fn test_check_dates_before_intake() {
        let mut input = batch(0);
        input.end_date = NaiveDate::from_ymd_opt(2023, 12, 1);
        assert_eq!(input.check().unwrap_err().to_string(), "endDate must be after startDate");
    }

    #[tokio::test]
    async fn test_add_batch_with_timings() {
        let (db, tenant_id) = setup().await;
        let service = BatchService::new(db);

        let id = service.add_batch(tenant_id, Uuid::new_v4(), &batch(10)).await.unwrap();
        let detail = service.get_batch(tenant_id, id).await.unwrap();

        assert_eq!(detail.timings.len(), 1);
        assert_eq!(detail.timings[0].day, "monday");
        assert_eq!(detail.timings[0].from_time, "09:00");
        assert_eq!(detail.active_talent_count, 0);
    }

    #[tokio::test]
    async fn test_enrol_skips_members_and_enforces_capacity() {
        let (db, tenant_id) = setup().await;
        let service = BatchService::new(db.clone());
        let talent_service = TalentService::new(db);
        let actor = Uuid::new_v4();

        let batch_id = service.add_batch(tenant_id, actor, &batch(2)).await.unwrap();
        let ids = talents(&talent_service, tenant_id, 3).await;

        let first = service
            .add_talents_to_batch(tenant_id, batch_id, actor, &ids[..1])
            .await
            .unwrap();
        assert_eq!(first, EnrolOutcome { added_count: 1, skipped_count: 0 });

        let second = service
            .add_talents_to_batch(tenant_id, batch_id, actor, &ids[..2])
            .await
            .unwrap();
        assert_eq!(second, EnrolOutcome { added_count: 1, skipped_count: 1 });

        let full = service
            .add_talents_to_batch(tenant_id, batch_id, actor, &ids[2..])
            .await
            .unwrap_err();
        assert!(matches!(full, AppError::Conflict { .. }));

        let list = service
            .get_batch_talent_list(tenant_id, batch_id, Page::default())
            .await
            .unwrap();
        assert_eq!(list.page.total, 2);
        assert_eq!(list.active_talents, 2);
    }

    #[tokio::test]
    async fn test_enrol_unknown_talent_is_not_found() {
        let (db, tenant_id) = setup().await;
        let service = BatchService::new(db);
        let actor = Uuid::new_v4();
        let batch_id = service.add_batch(tenant_id, actor, &batch(5)).await.unwrap();

        let err = service
            .add_talents_to_batch(tenant_id, batch_id, actor, &[Uuid::new_v4()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete_batch_removes_schedule() {
        let (db, tenant_id) = setup().await;
        let service = BatchService::new(db.clone());
        let actor = Uuid::new_v4();
        let batch_id = service.add_batch(tenant_id, actor, &batch(5)).await.unwrap();

        service.delete_batch(tenant_id, batch_id, actor).await.unwrap();

        assert!(timings_of(db.read(), tenant_id, batch_id).await.unwrap().is_empty());
        assert!(matches!(
            service.delete_batch(tenant_id, batch_id, actor).await,
            Err(AppError::NotFound { .. })
        ));
    }
}
