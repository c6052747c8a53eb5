//! Session feedback from batch talents

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use crate::db::models::{
    Feedback, FeedbackActiveModel, FeedbackColumn, FeedbackEntity, TalentColumn, TalentEntity,
};
use crate::db::repository::{self, now, TenantScoped};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::metrics::record_mutation;
use crate::pagination::{Page, Paged};
use crate::services::batch::is_active_member;
use crate::services::session::find_session;
use crate::validation::{self, Check};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackInput {
    #[serde(default)]
    pub talent_id: Uuid,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub score: i32,
    pub answer: Option<String>,
}

impl Check for FeedbackInput {
    fn check(&self) -> Result<()> {
        validation::id("talentId", self.talent_id)?;
        check_answer(&self.question, self.score, self.answer.as_deref())
    }
}

/// Editable part of a feedback; the talent and session stay fixed
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackUpdateInput {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub score: i32,
    pub answer: Option<String>,
}

impl Check for FeedbackUpdateInput {
    fn check(&self) -> Result<()> {
        check_answer(&self.question, self.score, self.answer.as_deref())
    }
}

fn check_answer(question: &str, score: i32, answer: Option<&str>) -> Result<()> {
    validation::required_max("question", question, 200)?;
    validation::range("score", score, 1, 10)?;
    validation::optional_max("answer", answer, 1000)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackView {
    pub id: Uuid,
    pub talent_id: Uuid,
    pub talent_name: String,
    pub question: String,
    pub score: i32,
    pub answer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FeedbackList {
    pub page: Paged<FeedbackView>,
    /// Mean score over every feedback of the session, not just the page
    pub average_score: Option<f64>,
}

#[derive(Clone)]
pub struct FeedbackService {
    db: DbPool,
}

impl FeedbackService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn add_feedback(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        session_id: Uuid,
        actor: Uuid,
        input: &FeedbackInput,
    ) -> Result<Uuid> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;
        find_session(conn, tenant_id, batch_id, session_id).await?;

        if !is_active_member(conn, tenant_id, batch_id, input.talent_id).await? {
            return Err(AppError::validation(
                "talentId",
                format!("talent {} is not an active member of batch {}", input.talent_id, batch_id),
            ));
        }
        ensure_unanswered(conn, tenant_id, session_id, input.talent_id, &input.question, None).await?;

        let feedback = FeedbackActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            batch_id: Set(batch_id),
            session_id: Set(session_id),
            talent_id: Set(input.talent_id),
            question: Set(input.question.trim().to_string()),
            score: Set(input.score),
            answer: Set(input.answer.clone()),
            created_by: Set(actor),
            created_at: Set(now()),
            updated_by: Set(None),
            updated_at: Set(None),
            deleted_by: Set(None),
            deleted_at: Set(None),
        }
        .insert(conn)
        .await?;

        record_mutation("feedback", "add");
        info!(
            tenant_id = %tenant_id,
            session_id = %session_id,
            feedback_id = %feedback.id,
            "Feedback added"
        );
        Ok(feedback.id)
    }

    pub async fn update_feedback(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        session_id: Uuid,
        feedback_id: Uuid,
        actor: Uuid,
        input: &FeedbackUpdateInput,
    ) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;

        let existing = find_feedback(conn, tenant_id, batch_id, session_id, feedback_id).await?;
        ensure_unanswered(
            conn,
            tenant_id,
            session_id,
            existing.talent_id,
            &input.question,
            Some(feedback_id),
        )
        .await?;

        let mut feedback: FeedbackActiveModel = existing.into();
        feedback.question = Set(input.question.trim().to_string());
        feedback.score = Set(input.score);
        feedback.answer = Set(input.answer.clone());
        feedback.updated_by = Set(Some(actor));
        feedback.updated_at = Set(Some(now()));
        feedback.update(conn).await?;

        record_mutation("feedback", "update");
        info!(tenant_id = %tenant_id, feedback_id = %feedback_id, "Feedback updated");
        Ok(())
    }

    pub async fn delete_feedback(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        session_id: Uuid,
        feedback_id: Uuid,
        actor: Uuid,
    ) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;
        find_feedback(conn, tenant_id, batch_id, session_id, feedback_id).await?;
        repository::soft_delete::<FeedbackEntity, _>(conn, tenant_id, feedback_id, actor).await?;

        record_mutation("feedback", "delete");
        info!(tenant_id = %tenant_id, feedback_id = %feedback_id, "Feedback deleted");
        Ok(())
    }

    pub async fn get_feedback_list(
        &self,
        tenant_id: Uuid,
        batch_id: Uuid,
        session_id: Uuid,
        page: Page,
    ) -> Result<FeedbackList> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;
        find_session(conn, tenant_id, batch_id, session_id).await?;

        let query = FeedbackEntity::scoped(tenant_id).filter(FeedbackColumn::SessionId.eq(session_id));

        let score_sum = query
            .clone()
            .select_only()
            .column_as(FeedbackColumn::Score.sum(), "total")
            .into_tuple::<Option<i64>>()
            .one(conn)
            .await?
            .flatten();
        let page = repository::fetch_page(conn, query, page).await?;
        let average_score = score_sum
            .filter(|_| page.total > 0)
            .map(|sum| sum as f64 / page.total as f64);

        let talent_ids: Vec<Uuid> = page.items.iter().map(|f| f.talent_id).collect();
        let names: HashMap<Uuid, String> = TalentEntity::find()
            .filter(TalentColumn::TenantId.eq(tenant_id))
            .filter(TalentColumn::Id.is_in(talent_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|t| (t.id, format!("{} {}", t.first_name, t.last_name)))
            .collect();

        let page = page.map(|f| FeedbackView {
            id: f.id,
            talent_id: f.talent_id,
            talent_name: names.get(&f.talent_id).cloned().unwrap_or_default(),
            question: f.question,
            score: f.score,
            answer: f.answer,
        });

        Ok(FeedbackList {
            page,
            average_score,
        })
    }
}

async fn find_feedback<C>(
    conn: &C,
    tenant_id: Uuid,
    batch_id: Uuid,
    session_id: Uuid,
    feedback_id: Uuid,
) -> Result<Feedback>
where
    C: ConnectionTrait,
{
    let feedback = repository::find::<FeedbackEntity, _>(conn, tenant_id, feedback_id).await?;
    if feedback.batch_id != batch_id || feedback.session_id != session_id {
        return Err(AppError::not_found("feedback", feedback_id));
    }
    Ok(feedback)
}

/// A talent answers each question of a session once
async fn ensure_unanswered<C>(
    conn: &C,
    tenant_id: Uuid,
    session_id: Uuid,
    talent_id: Uuid,
    question: &str,
    except: Option<Uuid>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let mut query = FeedbackEntity::scoped(tenant_id)
        .filter(FeedbackColumn::SessionId.eq(session_id))
        .filter(FeedbackColumn::TalentId.eq(talent_id))
        .filter(FeedbackColumn::Question.eq(question.trim()));
    if let Some(id) = except {
        query = query.filter(FeedbackColumn::Id.ne(id));
    }

    if query.count(conn).await? > 0 {
        return Err(AppError::conflict(format!(
            "talent {} already answered \"{}\" for session {}",
            talent_id,
            question.trim(),
            session_id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{BatchSessionActiveModel, BatchSessionEntity};
    use crate::services::batch::{BatchInput, BatchService, TimingInput};
    use crate::services::talent::{TalentInput, TalentService};
    use crate::services::testing::setup;
    use chrono::NaiveDate;

    struct Fixture {
        service: FeedbackService,
        tenant_id: Uuid,
        batch_id: Uuid,
        session_id: Uuid,
        member: Uuid,
        outsider: Uuid,
    }

    async fn fixture() -> Fixture {
        let (db, tenant_id) = setup().await;
        let actor = Uuid::new_v4();

        let talents = TalentService::new(db.clone());
        let mut ids = Vec::new();
        for (name, email) in [("Asha", "asha@example.com"), ("Ravi", "ravi@example.com")] {
            let input = TalentInput {
                first_name: name.to_string(),
                last_name: "Iyer".to_string(),
                email: email.to_string(),
                contact: "9876543210".to_string(),
                academic_year: "graduate".to_string(),
                is_active: true,
                ..Default::default()
            };
            ids.push(talents.add_talent(tenant_id, actor, &input).await.unwrap());
        }

        let batches = BatchService::new(db.clone());
        let batch_id = batches
            .add_batch(
                tenant_id,
                actor,
                &BatchInput {
                    name: "Cohort".to_string(),
                    course_name: "Rust".to_string(),
                    start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
                    end_date: None,
                    total_intake: 5,
                    status: "ongoing".to_string(),
                    is_active: true,
                    timings: vec![TimingInput {
                        day: "monday".to_string(),
                        from_time: "09:00".to_string(),
                        to_time: "11:00".to_string(),
                    }],
                },
            )
            .await
            .unwrap();
        batches
            .add_talents_to_batch(tenant_id, batch_id, actor, &[ids[0]])
            .await
            .unwrap();

        let session = BatchSessionActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            batch_id: Set(batch_id),
            session_date: Set(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            session_order: Set(1),
            is_completed: Set(false),
            completed_at: Set(None),
            created_by: Set(actor),
            created_at: Set(now()),
            updated_by: Set(None),
            updated_at: Set(None),
            deleted_by: Set(None),
            deleted_at: Set(None),
        };
        let session_id = BatchSessionEntity::insert(session)
            .exec(db.write())
            .await
            .unwrap()
            .last_insert_id;

        Fixture {
            service: FeedbackService::new(db),
            tenant_id,
            batch_id,
            session_id,
            member: ids[0],
            outsider: ids[1],
        }
    }

    fn answer(talent_id: Uuid, question: &str, score: i32) -> FeedbackInput {
        FeedbackInput {
            talent_id,
            question: question.to_string(),
            score,
            answer: None,
        }
    }

    #[test]
    fn test_score_bounds() {
        let err = answer(Uuid::new_v4(), "Pace?", 11).check().unwrap_err();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field.as_deref() == Some("score")));
        assert!(answer(Uuid::new_v4(), "Pace?", 10).check().is_ok());
    }

    #[tokio::test]
    async fn test_one_answer_per_question() {
        let f = fixture().await;
        let actor = Uuid::new_v4();

        f.service
            .add_feedback(f.tenant_id, f.batch_id, f.session_id, actor, &answer(f.member, "Pace?", 8))
            .await
            .unwrap();
        let err = f
            .service
            .add_feedback(f.tenant_id, f.batch_id, f.session_id, actor, &answer(f.member, "Pace?", 6))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_outsider_cannot_give_feedback() {
        let f = fixture().await;

        let err = f
            .service
            .add_feedback(
                f.tenant_id,
                f.batch_id,
                f.session_id,
                Uuid::new_v4(),
                &answer(f.outsider, "Pace?", 8),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_list_carries_names_and_average() {
        let f = fixture().await;
        let actor = Uuid::new_v4();
        for (question, score) in [("Pace?", 7), ("Clarity?", 10)] {
            f.service
                .add_feedback(f.tenant_id, f.batch_id, f.session_id, actor, &answer(f.member, question, score))
                .await
                .unwrap();
        }

        let list = f
            .service
            .get_feedback_list(f.tenant_id, f.batch_id, f.session_id, Page::default())
            .await
            .unwrap();
        assert_eq!(list.page.total, 2);
        assert_eq!(list.average_score, Some(8.5));
        assert!(list.page.items.iter().all(|v| v.talent_name == "Asha Iyer"));
    }

    #[tokio::test]
    async fn test_session_of_other_batch_is_not_found() {
        let f = fixture().await;

        let err = f
            .service
            .add_feedback(f.tenant_id, Uuid::new_v4(), f.session_id, Uuid::new_v4(), &answer(f.member, "Pace?", 8))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }
}
