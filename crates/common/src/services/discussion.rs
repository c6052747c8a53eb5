//! Community forum: discussions and their replies
//!
//! Only the author of a discussion or reply may change or remove it.
//! Replies can answer the discussion directly or another reply of the same
//! discussion.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::models::{
    BatchEntity, Discussion, DiscussionActiveModel, DiscussionColumn, DiscussionEntity, Reply,
    ReplyActiveModel, ReplyColumn, ReplyEntity,
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
pub struct DiscussionInput {
    pub batch_id: Option<Uuid>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub question: String,
}

impl Check for DiscussionInput {
    fn check(&self) -> Result<()> {
        if let Some(batch_id) = self.batch_id {
            validation::id("batchId", batch_id)?;
        }
        validation::required_max("title", &self.title, 200)?;
        validation::required_max("question", &self.question, 5000)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyInput {
    pub parent_reply_id: Option<Uuid>,
    #[serde(default)]
    pub reply: String,
}

impl Check for ReplyInput {
    fn check(&self) -> Result<()> {
        if let Some(parent) = self.parent_reply_id {
            validation::id("parentReplyId", parent)?;
        }
        validation::required_max("reply", &self.reply, 5000)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionFilter {
    pub search: Option<String>,
    pub batch_id: Option<Uuid>,
}

// ============================================================================
// Output
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionView {
    #[serde(flatten)]
    pub discussion: Discussion,
    pub reply_count: u64,
}

// ============================================================================
// Service
// ============================================================================

#[derive(Clone)]
pub struct DiscussionService {
    db: DbPool,
}

impl DiscussionService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn add_discussion(
        &self,
        tenant_id: Uuid,
        actor: Uuid,
        input: &DiscussionInput,
    ) -> Result<Uuid> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;
        if let Some(batch_id) = input.batch_id {
            repository::ensure_exists::<BatchEntity, _>(conn, tenant_id, batch_id).await?;
        }

        let discussion = DiscussionActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            batch_id: Set(input.batch_id),
            title: Set(input.title.trim().to_string()),
            question: Set(input.question.clone()),
            created_by: Set(actor),
            created_at: Set(now()),
            updated_by: Set(None),
            updated_at: Set(None),
            deleted_by: Set(None),
            deleted_at: Set(None),
        }
        .insert(conn)
        .await?;

        record_mutation("discussion", "add");
        info!(tenant_id = %tenant_id, discussion_id = %discussion.id, "Discussion added");
        Ok(discussion.id)
    }

    pub async fn update_discussion(
        &self,
        tenant_id: Uuid,
        discussion_id: Uuid,
        actor: Uuid,
        input: &DiscussionInput,
    ) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;

        let existing = repository::find::<DiscussionEntity, _>(conn, tenant_id, discussion_id).await?;
        ensure_author("discussion", existing.created_by, actor)?;
        if let Some(batch_id) = input.batch_id {
            repository::ensure_exists::<BatchEntity, _>(conn, tenant_id, batch_id).await?;
        }

        let mut discussion: DiscussionActiveModel = existing.into();
        discussion.batch_id = Set(input.batch_id);
        discussion.title = Set(input.title.trim().to_string());
        discussion.question = Set(input.question.clone());
        discussion.updated_by = Set(Some(actor));
        discussion.updated_at = Set(Some(now()));
        discussion.update(conn).await?;

        record_mutation("discussion", "update");
        info!(tenant_id = %tenant_id, discussion_id = %discussion_id, "Discussion updated");
        Ok(())
    }

    /// Soft-delete a discussion and every reply in it
    pub async fn delete_discussion(
        &self,
        tenant_id: Uuid,
        discussion_id: Uuid,
        actor: Uuid,
    ) -> Result<()> {
        let txn = self.db.begin().await?;
        repository::ensure_tenant(&txn, tenant_id).await?;

        let existing = repository::find::<DiscussionEntity, _>(&txn, tenant_id, discussion_id).await?;
        ensure_author("discussion", existing.created_by, actor)?;

        let replies = repository::soft_delete_where::<ReplyEntity, _, _>(
            &txn,
            tenant_id,
            ReplyColumn::DiscussionId.eq(discussion_id),
            actor,
        )
        .await?;
        repository::soft_delete::<DiscussionEntity, _>(&txn, tenant_id, discussion_id, actor).await?;
        txn.commit().await?;

        record_mutation("discussion", "delete");
        info!(
            tenant_id = %tenant_id,
            discussion_id = %discussion_id,
            replies = replies,
            "Discussion deleted"
        );
        Ok(())
    }

    pub async fn get_discussion(&self, tenant_id: Uuid, discussion_id: Uuid) -> Result<DiscussionView> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;

        let discussion = repository::find::<DiscussionEntity, _>(conn, tenant_id, discussion_id).await?;
        let reply_count = reply_counts(conn, tenant_id, &[discussion_id])
            .await?
            .remove(&discussion_id)
            .unwrap_or(0);

        Ok(DiscussionView {
            discussion,
            reply_count,
        })
    }

    pub async fn get_discussion_list(
        &self,
        tenant_id: Uuid,
        filter: &DiscussionFilter,
        page: Page,
    ) -> Result<Paged<DiscussionView>> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;

        let mut query = DiscussionEntity::scoped(tenant_id);
        if let Some(ref term) = filter.search {
            query = query.filter(search_condition(
                &[DiscussionColumn::Title, DiscussionColumn::Question],
                term,
            ));
        }
        if let Some(batch_id) = filter.batch_id {
            query = query.filter(DiscussionColumn::BatchId.eq(batch_id));
        }

        let page = repository::fetch_page(conn, query, page).await?;
        let ids: Vec<Uuid> = page.items.iter().map(|d| d.id).collect();
        let counts = reply_counts(conn, tenant_id, &ids).await?;

        Ok(page.map(|discussion| DiscussionView {
            reply_count: counts.get(&discussion.id).copied().unwrap_or(0),
            discussion,
        }))
    }

    // ------------------------------------------------------------------------
    // Replies
    // ------------------------------------------------------------------------

    pub async fn add_reply(
        &self,
        tenant_id: Uuid,
        discussion_id: Uuid,
        actor: Uuid,
        input: &ReplyInput,
    ) -> Result<Uuid> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::ensure_exists::<DiscussionEntity, _>(conn, tenant_id, discussion_id).await?;

        if let Some(parent_id) = input.parent_reply_id {
            let parent = repository::find::<ReplyEntity, _>(conn, tenant_id, parent_id).await?;
            if parent.discussion_id != discussion_id {
                return Err(AppError::validation(
                    "parentReplyId",
                    format!("reply {} belongs to another discussion", parent_id),
                ));
            }
        }

        let reply = ReplyActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            discussion_id: Set(discussion_id),
            parent_reply_id: Set(input.parent_reply_id),
            reply: Set(input.reply.clone()),
            created_by: Set(actor),
            created_at: Set(now()),
            updated_by: Set(None),
            updated_at: Set(None),
            deleted_by: Set(None),
            deleted_at: Set(None),
        }
        .insert(conn)
        .await?;

        record_mutation("reply", "add");
        info!(
            tenant_id = %tenant_id,
            discussion_id = %discussion_id,
            reply_id = %reply.id,
            "Reply added"
        );
        Ok(reply.id)
    }

    pub async fn update_reply(
        &self,
        tenant_id: Uuid,
        discussion_id: Uuid,
        reply_id: Uuid,
        actor: Uuid,
        input: &ReplyInput,
    ) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;

        let existing = find_reply(conn, tenant_id, discussion_id, reply_id).await?;
        ensure_author("reply", existing.created_by, actor)?;

        let mut reply: ReplyActiveModel = existing.into();
        reply.reply = Set(input.reply.clone());
        reply.updated_by = Set(Some(actor));
        reply.updated_at = Set(Some(now()));
        reply.update(conn).await?;

        record_mutation("reply", "update");
        info!(tenant_id = %tenant_id, reply_id = %reply_id, "Reply updated");
        Ok(())
    }

    pub async fn delete_reply(
        &self,
        tenant_id: Uuid,
        discussion_id: Uuid,
        reply_id: Uuid,
        actor: Uuid,
    ) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;

        let existing = find_reply(conn, tenant_id, discussion_id, reply_id).await?;
        ensure_author("reply", existing.created_by, actor)?;
        repository::soft_delete::<ReplyEntity, _>(conn, tenant_id, reply_id, actor).await?;

        record_mutation("reply", "delete");
        info!(tenant_id = %tenant_id, reply_id = %reply_id, "Reply deleted");
        Ok(())
    }

    /// Replies of a discussion, oldest first
    pub async fn get_reply_list(
        &self,
        tenant_id: Uuid,
        discussion_id: Uuid,
        page: Page,
    ) -> Result<Paged<Reply>> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::ensure_exists::<DiscussionEntity, _>(conn, tenant_id, discussion_id).await?;

        let query = ReplyEntity::scoped(tenant_id).filter(ReplyColumn::DiscussionId.eq(discussion_id));
        let total = query.clone().count(conn).await?;
        let items = query
            .order_by_asc(ReplyColumn::CreatedAt)
            .offset(page.offset)
            .limit(page.limit)
            .all(conn)
            .await?;

        Ok(Paged::new(items, total))
    }
}

fn ensure_author(resource: &str, author: Uuid, actor: Uuid) -> Result<()> {
    if author != actor {
        warn!(author = %author, actor = %actor, "{} change attempted by non-author", resource);
        return Err(AppError::forbidden(format!("only the author may change this {}", resource)));
    }
    Ok(())
}

async fn find_reply<C>(conn: &C, tenant_id: Uuid, discussion_id: Uuid, reply_id: Uuid) -> Result<Reply>
where
    C: ConnectionTrait,
{
    let reply = repository::find::<ReplyEntity, _>(conn, tenant_id, reply_id).await?;
    if reply.discussion_id != discussion_id {
        return Err(AppError::not_found("reply", reply_id));
    }
    Ok(reply)
}

/// Live reply count per discussion
async fn reply_counts<C>(
    conn: &C,
    tenant_id: Uuid,
    discussion_ids: &[Uuid],
) -> Result<HashMap<Uuid, u64>>
where
    C: ConnectionTrait,
{
    if discussion_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = ReplyEntity::scoped(tenant_id)
        .filter(ReplyColumn::DiscussionId.is_in(discussion_ids.to_vec()))
        .select_only()
        .column(ReplyColumn::DiscussionId)
        .column_as(ReplyColumn::Id.count(), "replies")
        .group_by(ReplyColumn::DiscussionId)
        .into_tuple::<(Uuid, i64)>()
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(id, count)| (id, u64::try_from(count).unwrap_or(0)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::setup;

    fn discussion(title: &str) -> DiscussionInput {
        DiscussionInput {
            batch_id: None,
            title: title.to_string(),
            question: format!("Can someone explain {}?", title.to_lowercase()),
        }
    }

    fn reply(text: &str, parent: Option<Uuid>) -> ReplyInput {
        ReplyInput {
            parent_reply_id: parent,
            reply: text.to_string(),
        }
    }

    #[tokio::test]
    async fn test_reply_to_missing_discussion() {
        let (db, tenant_id) = setup().await;
        let service = DiscussionService::new(db);

        let err = service
            .add_reply(tenant_id, Uuid::new_v4(), Uuid::new_v4(), &reply("Pin it", None))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound { ref resource_type, .. } if resource_type == "discussion"));
    }

    #[tokio::test]
    async fn test_parent_reply_must_share_discussion() {
        let (db, tenant_id) = setup().await;
        let service = DiscussionService::new(db);
        let author = Uuid::new_v4();

        let first = service.add_discussion(tenant_id, author, &discussion("Lifetimes")).await.unwrap();
        let second = service.add_discussion(tenant_id, author, &discussion("Traits")).await.unwrap();
        let parent = service.add_reply(tenant_id, first, author, &reply("Pin it", None)).await.unwrap();

        let err = service
            .add_reply(tenant_id, second, author, &reply("Agreed", Some(parent)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        service
            .add_reply(tenant_id, first, author, &reply("Agreed", Some(parent)))
            .await
            .unwrap();
        let view = service.get_discussion(tenant_id, first).await.unwrap();
        assert_eq!(view.reply_count, 2);
    }

    #[tokio::test]
    async fn test_only_author_changes_discussion() {
        let (db, tenant_id) = setup().await;
        let service = DiscussionService::new(db);
        let author = Uuid::new_v4();
        let id = service.add_discussion(tenant_id, author, &discussion("Lifetimes")).await.unwrap();

        let err = service
            .update_discussion(tenant_id, id, Uuid::new_v4(), &discussion("Hijacked"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));

        let err = service.delete_discussion(tenant_id, id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));
    }

    #[tokio::test]
    async fn test_delete_removes_replies() {
        let (db, tenant_id) = setup().await;
        let service = DiscussionService::new(db);
        let author = Uuid::new_v4();
        let id = service.add_discussion(tenant_id, author, &discussion("Lifetimes")).await.unwrap();
        let reply_id = service.add_reply(tenant_id, id, author, &reply("Pin it", None)).await.unwrap();

        service.delete_discussion(tenant_id, id, author).await.unwrap();

        let err = service.get_discussion(tenant_id, id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
        let err = service.delete_reply(tenant_id, id, reply_id, author).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_filters_and_counts() {
        let (db, tenant_id) = setup().await;
        let service = DiscussionService::new(db);
        let author = Uuid::new_v4();
        let id = service.add_discussion(tenant_id, author, &discussion("Lifetimes")).await.unwrap();
        service.add_discussion(tenant_id, author, &discussion("Traits")).await.unwrap();
        service.add_reply(tenant_id, id, author, &reply("Pin it", None)).await.unwrap();

        let filter = DiscussionFilter {
            search: Some("LIFE".to_string()),
            batch_id: None,
        };
        let list = service.get_discussion_list(tenant_id, &filter, Page::default()).await.unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.items[0].reply_count, 1);
    }
}
