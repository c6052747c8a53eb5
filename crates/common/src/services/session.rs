//! Batch session plans
//!
//! A plan is generated once per batch from its weekly schedule and ordered
//! modules, then tracked session by session as teaching progresses.

use chrono::{NaiveDate, Weekday};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;
use uuid::Uuid;

use crate::db::models::{
    BatchEntity, BatchModuleColumn, BatchModuleEntity, BatchSession, BatchSessionActiveModel,
    BatchSessionColumn, BatchSessionEntity, CourseModuleColumn, CourseModuleEntity,
    ModuleTopicColumn, ModuleTopicEntity, SessionTopic, SessionTopicActiveModel,
    SessionTopicColumn, SessionTopicEntity,
};
use crate::db::repository::{self, now, TenantScoped};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::metrics::{record_mutation, record_session_plan};
use crate::services::batch::timings_of;
use crate::services::course::teaching_units;
use crate::services::planner::{self, PlannedSession};
use crate::validation::{self, Check};

/// Completion update of one session
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdateInput {
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub completed_topic_ids: Vec<Uuid>,
}

impl Check for SessionUpdateInput {
    fn check(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for id in &self.completed_topic_ids {
            validation::id("completedTopicIds", *id)?;
            if !seen.insert(id) {
                return Err(AppError::validation(
                    "completedTopicIds",
                    "completedTopicIds must not repeat",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTopicView {
    pub id: Uuid,
    pub module_id: Uuid,
    pub module_name: String,
    pub topic_id: Uuid,
    pub topic_name: String,
    pub sub_topic_id: Option<Uuid>,
    pub sub_topic_name: Option<String>,
    pub allocated_minutes: i32,
    pub order: i32,
    pub is_completed: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub id: Uuid,
    pub session_date: NaiveDate,
    pub session_order: i32,
    pub is_completed: bool,
    pub completed_at: Option<String>,
    pub topics: Vec<SessionTopicView>,
}

#[derive(Debug, Clone)]
pub struct SessionPlan {
    pub sessions: Vec<SessionView>,
    pub completed_count: usize,
}

#[derive(Clone)]
pub struct SessionService {
    db: DbPool,
}

impl SessionService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Generate and store the session plan of a batch
    ///
    /// Returns the number of sessions created.
    pub async fn generate_session_plan(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        actor: Uuid,
    ) -> Result<usize> {
        let txn = self.db.begin().await?;
        repository::ensure_tenant(&txn, tenant_id).await?;

        let batch = repository::find::<BatchEntity, _>(&txn, tenant_id, batch_id).await?;

        let existing = BatchSessionEntity::scoped(tenant_id)
            .filter(BatchSessionColumn::BatchId.eq(batch_id))
            .count(&txn)
            .await?;
        if existing > 0 {
            return Err(AppError::conflict(format!(
                "batch {} already has a session plan",
                batch_id
            )));
        }

        let schedule: Vec<_> = timings_of(&txn, tenant_id, batch_id)
            .await?
            .iter()
            .filter_map(|timing| {
                let day = u8::try_from(timing.day_of_week).ok()?;
                Some((Weekday::try_from(day).ok()?, timing.minutes()))
            })
            .collect();

        let module_ids: Vec<Uuid> = BatchModuleEntity::scoped(tenant_id)
            .filter(BatchModuleColumn::BatchId.eq(batch_id))
            .order_by_asc(BatchModuleColumn::ModuleOrder)
            .all(&txn)
            .await?
            .into_iter()
            .map(|m| m.module_id)
            .collect();
        let units = teaching_units(&txn, tenant_id, &module_ids).await?;

        let plan = planner::allocate(batch.start_date, batch.end_date, &schedule, &units)?;
        store_plan(&txn, tenant_id, batch_id, actor, &plan).await?;
        txn.commit().await?;

        record_session_plan(plan.len());
        info!(
            tenant_id = %tenant_id,
            batch_id = %batch_id,
            sessions = plan.len(),
            "Session plan generated"
        );
        Ok(plan.len())
    }

    /// Sessions of a batch in order, with their topics
    pub async fn get_session_plan(&self, tenant_id: Uuid, batch_id: Uuid) -> Result<SessionPlan> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::ensure_exists::<BatchEntity, _>(conn, tenant_id, batch_id).await?;

        let sessions = BatchSessionEntity::scoped(tenant_id)
            .filter(BatchSessionColumn::BatchId.eq(batch_id))
            .order_by_asc(BatchSessionColumn::SessionOrder)
            .all(conn)
            .await?;
        let topics = SessionTopicEntity::scoped(tenant_id)
            .filter(SessionTopicColumn::BatchId.eq(batch_id))
            .order_by_asc(SessionTopicColumn::TopicOrder)
            .all(conn)
            .await?;

        let sessions = describe(conn, tenant_id, sessions, topics).await?;
        let completed_count = sessions.iter().filter(|s| s.is_completed).count();

        Ok(SessionPlan {
            sessions,
            completed_count,
        })
    }

    pub async fn get_session(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        session_id: Uuid,
    ) -> Result<SessionView> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;

        let session = find_session(conn, tenant_id, batch_id, session_id).await?;
        let topics = topics_of(conn, tenant_id, session_id).await?;

        describe(conn, tenant_id, vec![session], topics)
            .await?
            .pop()
            .ok_or_else(|| AppError::not_found("session", session_id))
    }

    /// Record completion of a session and of the listed topics
    pub async fn update_session(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        session_id: Uuid,
        actor: Uuid,
        input: &SessionUpdateInput,
    ) -> Result<()> {
        let txn = self.db.begin().await?;
        repository::ensure_tenant(&txn, tenant_id).await?;

        let session = find_session(&txn, tenant_id, batch_id, session_id).await?;
        let topic_ids: HashSet<Uuid> = topics_of(&txn, tenant_id, session_id)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();

        if let Some(stray) = input.completed_topic_ids.iter().find(|id| !topic_ids.contains(id)) {
            return Err(AppError::validation(
                "completedTopicIds",
                format!("topic {} does not belong to session {}", stray, session_id),
            ));
        }

        let stamp = now();
        SessionTopicEntity::update_many()
            .col_expr(SessionTopicColumn::IsCompleted, Expr::value(false))
            .col_expr(SessionTopicColumn::UpdatedBy, Expr::value(actor))
            .col_expr(SessionTopicColumn::UpdatedAt, Expr::value(stamp))
            .filter(SessionTopicColumn::SessionId.eq(session_id))
            .filter(SessionTopicColumn::DeletedAt.is_null())
            .filter(SessionTopicColumn::Id.is_not_in(input.completed_topic_ids.clone()))
            .exec(&txn)
            .await?;
        if !input.completed_topic_ids.is_empty() {
            SessionTopicEntity::update_many()
                .col_expr(SessionTopicColumn::IsCompleted, Expr::value(true))
                .col_expr(SessionTopicColumn::UpdatedBy, Expr::value(actor))
                .col_expr(SessionTopicColumn::UpdatedAt, Expr::value(stamp))
                .filter(SessionTopicColumn::SessionId.eq(session_id))
                .filter(SessionTopicColumn::Id.is_in(input.completed_topic_ids.clone()))
                .exec(&txn)
                .await?;
        }

        let completed_at = match (input.is_completed, session.completed_at) {
            (true, Some(at)) => Some(at),
            (true, None) => Some(stamp),
            (false, _) => None,
        };
        let mut session: BatchSessionActiveModel = session.into();
        session.is_completed = Set(input.is_completed);
        session.completed_at = Set(completed_at);
        session.updated_by = Set(Some(actor));
        session.updated_at = Set(Some(stamp));
        session.update(&txn).await?;
        txn.commit().await?;

        record_mutation("session", "update");
        info!(
            tenant_id = %tenant_id,
            session_id = %session_id,
            completed = input.is_completed,
            topics = input.completed_topic_ids.len(),
            "Session updated"
        );
        Ok(())
    }

    /// Soft-delete every session of a batch plan with its topics
    pub async fn delete_session_plan(&self, tenant_id: Uuid, batch_id: Uuid, actor: Uuid) -> Result<()> {
        let txn = self.db.begin().await?;
        repository::ensure_tenant(&txn, tenant_id).await?;
        repository::ensure_exists::<BatchEntity, _>(&txn, tenant_id, batch_id).await?;

        repository::soft_delete_where::<SessionTopicEntity, _, _>(
            &txn,
            tenant_id,
            SessionTopicColumn::BatchId.eq(batch_id),
            actor,
        )
        .await?;
        let deleted = repository::soft_delete_where::<BatchSessionEntity, _, _>(
            &txn,
            tenant_id,
            BatchSessionColumn::BatchId.eq(batch_id),
            actor,
        )
        .await?;
        if deleted == 0 {
            return Err(AppError::not_found("session plan", batch_id));
        }
        txn.commit().await?;

        record_mutation("session", "delete");
        info!(tenant_id = %tenant_id, batch_id = %batch_id, sessions = deleted, "Session plan deleted");
        Ok(())
    }
}

/// Find a live session and check it belongs to the batch
pub(crate) async fn find_session<C>(
    conn: &C,
    tenant_id: Uuid,
    batch_id: Uuid,
    session_id: Uuid,
) -> Result<BatchSession>
where
    C: ConnectionTrait,
{
    let session = repository::find::<BatchSessionEntity, _>(conn, tenant_id, session_id).await?;
    if session.batch_id != batch_id {
        return Err(AppError::not_found("session", session_id));
    }
    Ok(session)
}

async fn topics_of<C>(conn: &C, tenant_id: Uuid, session_id: Uuid) -> Result<Vec<SessionTopic>>
where
    C: ConnectionTrait,
{
    SessionTopicEntity::scoped(tenant_id)
        .filter(SessionTopicColumn::SessionId.eq(session_id))
        .order_by_asc(SessionTopicColumn::TopicOrder)
        .all(conn)
        .await
        .map_err(Into::into)
}

async fn store_plan<C>(
    conn: &C,
    tenant_id: Uuid,
    batch_id: Uuid,
    actor: Uuid,
    plan: &[PlannedSession],
) -> Result<()>
where
    C: ConnectionTrait,
{
    let stamp = now();

    for planned in plan {
        let session = BatchSessionActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            batch_id: Set(batch_id),
            session_date: Set(planned.date),
            session_order: Set(planned.order as i32),
            is_completed: Set(false),
            completed_at: Set(None),
            created_by: Set(actor),
            created_at: Set(stamp),
            updated_by: Set(None),
            updated_at: Set(None),
            deleted_by: Set(None),
            deleted_at: Set(None),
        }
        .insert(conn)
        .await?;

        for topic in &planned.topics {
            SessionTopicActiveModel {
                id: Set(Uuid::new_v4()),
                tenant_id: Set(tenant_id),
                session_id: Set(session.id),
                batch_id: Set(batch_id),
                module_id: Set(topic.unit.module_id),
                topic_id: Set(topic.unit.topic_id),
                sub_topic_id: Set(topic.unit.sub_topic_id),
                allocated_minutes: Set(topic.minutes as i32),
                topic_order: Set(topic.order as i32),
                is_completed: Set(false),
                created_by: Set(actor),
                created_at: Set(stamp),
                updated_by: Set(None),
                updated_at: Set(None),
                deleted_by: Set(None),
                deleted_at: Set(None),
            }
            .insert(conn)
            .await?;
        }
    }

    Ok(())
}

/// Join sessions with their topics and the module/topic names
async fn describe<C>(
    conn: &C,
    tenant_id: Uuid,
    sessions: Vec<BatchSession>,
    topics: Vec<SessionTopic>,
) -> Result<Vec<SessionView>>
where
    C: ConnectionTrait,
{
    let module_ids: HashSet<Uuid> = topics.iter().map(|t| t.module_id).collect();
    let topic_ids: HashSet<Uuid> = topics
        .iter()
        .flat_map(|t| std::iter::once(t.topic_id).chain(t.sub_topic_id))
        .collect();

    // Names are shown even when the module or topic was deleted after planning
    let module_names: HashMap<Uuid, String> = CourseModuleEntity::find()
        .filter(CourseModuleColumn::TenantId.eq(tenant_id))
        .filter(CourseModuleColumn::Id.is_in(module_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|m| (m.id, m.name))
        .collect();
    let topic_names: HashMap<Uuid, String> = ModuleTopicEntity::find()
        .filter(ModuleTopicColumn::TenantId.eq(tenant_id))
        .filter(ModuleTopicColumn::Id.is_in(topic_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|t| (t.id, t.name))
        .collect();

    let mut by_session: HashMap<Uuid, Vec<SessionTopicView>> = HashMap::new();
    for topic in topics {
        let name_of = |id: &Uuid| topic_names.get(id).cloned().unwrap_or_default();
        by_session.entry(topic.session_id).or_default().push(SessionTopicView {
            id: topic.id,
            module_id: topic.module_id,
            module_name: module_names.get(&topic.module_id).cloned().unwrap_or_default(),
            topic_id: topic.topic_id,
            topic_name: name_of(&topic.topic_id),
            sub_topic_id: topic.sub_topic_id,
            sub_topic_name: topic.sub_topic_id.as_ref().map(name_of),
            allocated_minutes: topic.allocated_minutes,
            order: topic.topic_order,
            is_completed: topic.is_completed,
        });
    }

    Ok(sessions
        .into_iter()
        .map(|session| SessionView {
            id: session.id,
            session_date: session.session_date,
            session_order: session.session_order,
            is_completed: session.is_completed,
            completed_at: session.completed_at.map(|at| at.to_rfc3339()),
            topics: by_session.remove(&session.id).unwrap_or_default(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::batch::{AssignModulesInput, BatchInput, BatchService, ModuleOrderInput, TimingInput};
    use crate::services::course::{CourseService, ModuleInput, TopicInput};
    use crate::services::testing::setup;

    struct Fixture {
        service: SessionService,
        tenant_id: Uuid,
        batch_id: Uuid,
        actor: Uuid,
    }

    /// Batch starting Monday 2024-01-01 meeting Mon/Wed for two hours, with
    /// one module of 90 + 120 + 30 minutes of topics
    async fn fixture(end_date: Option<NaiveDate>) -> Fixture {
        let (db, tenant_id) = setup().await;
        let actor = Uuid::new_v4();

        let batches = BatchService::new(db.clone());
        let slot = |day: &str| TimingInput {
            day: day.to_string(),
            from_time: "09:00".to_string(),
            to_time: "11:00".to_string(),
        };
        let batch_id = batches
            .add_batch(
                tenant_id,
                actor,
                &BatchInput {
                    name: "Cohort".to_string(),
                    course_name: "Rust".to_string(),
                    start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
                    end_date,
                    total_intake: 10,
                    status: "upcoming".to_string(),
                    is_active: true,
                    timings: vec![slot("monday"), slot("wednesday")],
                },
            )
            .await
            .unwrap();

        let courses = CourseService::new(db.clone());
        let module_id = courses
            .add_module(
                tenant_id,
                actor,
                &ModuleInput {
                    name: "Basics".to_string(),
                    description: None,
                },
            )
            .await
            .unwrap();
        for (order, minutes) in [(1, 90), (2, 120), (3, 30)] {
            let topic = TopicInput {
                name: format!("Topic {}", order),
                order,
                total_time: minutes,
                parent_topic_id: None,
            };
            courses.add_topic(tenant_id, module_id, actor, &topic).await.unwrap();
        }

        batches
            .assign_batch_modules(
                tenant_id,
                batch_id,
                actor,
                &AssignModulesInput {
                    modules: vec![ModuleOrderInput { module_id, order: 1 }],
                },
            )
            .await
            .unwrap();

        Fixture {
            service: SessionService::new(db),
            tenant_id,
            batch_id,
            actor,
        }
    }

    #[tokio::test]
    async fn test_generate_plan_follows_schedule() {
        let f = fixture(None).await;

        let count = f.service.generate_session_plan(f.tenant_id, f.batch_id, f.actor).await.unwrap();
        assert_eq!(count, 2);

        let plan = f.service.get_session_plan(f.tenant_id, f.batch_id).await.unwrap();
        let dates: Vec<_> = plan.sessions.iter().map(|s| s.session_date).collect();
        assert_eq!(
            dates,
            vec![NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 3).unwrap()]
        );

        // Topic 2 is split 30 + 90 across the two days
        let first: Vec<_> = plan.sessions[0].topics.iter().map(|t| t.allocated_minutes).collect();
        let second: Vec<_> = plan.sessions[1].topics.iter().map(|t| t.allocated_minutes).collect();
        assert_eq!(first, vec![90, 30]);
        assert_eq!(second, vec![90, 30]);
        assert_eq!(plan.sessions[1].topics[0].topic_name, "Topic 2");
        assert_eq!(plan.completed_count, 0);
    }

    #[tokio::test]
    async fn test_second_generation_conflicts() {
        let f = fixture(None).await;
        f.service.generate_session_plan(f.tenant_id, f.batch_id, f.actor).await.unwrap();

        let err = f.service.generate_session_plan(f.tenant_id, f.batch_id, f.actor).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_end_date_too_early_stores_nothing() {
        let f = fixture(NaiveDate::from_ymd_opt(2024, 1, 2)).await;

        let err = f.service.generate_session_plan(f.tenant_id, f.batch_id, f.actor).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));

        let plan = f.service.get_session_plan(f.tenant_id, f.batch_id).await.unwrap();
        assert!(plan.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_update_session_completion() {
        let f = fixture(None).await;
        f.service.generate_session_plan(f.tenant_id, f.batch_id, f.actor).await.unwrap();
        let plan = f.service.get_session_plan(f.tenant_id, f.batch_id).await.unwrap();
        let session = &plan.sessions[0];

        let input = SessionUpdateInput {
            is_completed: true,
            completed_topic_ids: vec![session.topics[0].id],
        };
        f.service
            .update_session(f.tenant_id, f.batch_id, session.id, f.actor, &input)
            .await
            .unwrap();

        let view = f.service.get_session(f.tenant_id, f.batch_id, session.id).await.unwrap();
        assert!(view.is_completed);
        assert!(view.completed_at.is_some());
        assert!(view.topics[0].is_completed);
        assert!(!view.topics[1].is_completed);

        let stray = SessionUpdateInput {
            is_completed: true,
            completed_topic_ids: vec![plan.sessions[1].topics[0].id],
        };
        let err = f
            .service
            .update_session(f.tenant_id, f.batch_id, session.id, f.actor, &stray)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_delete_plan_twice() {
        let f = fixture(None).await;
        f.service.generate_session_plan(f.tenant_id, f.batch_id, f.actor).await.unwrap();

        f.service.delete_session_plan(f.tenant_id, f.batch_id, f.actor).await.unwrap();
        let err = f.service.delete_session_plan(f.tenant_id, f.batch_id, f.actor).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }
}
