//! Course modules and their topic tree

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::db::models::{
    CourseModule, CourseModuleActiveModel, CourseModuleColumn, CourseModuleEntity, ModuleTopic,
    ModuleTopicActiveModel, ModuleTopicColumn, ModuleTopicEntity,
};
use crate::db::repository::{self, now, TenantScoped};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::metrics::record_mutation;
use crate::pagination::{Page, Paged};
use crate::services::planner::Unit;
use crate::services::search_condition;
use crate::validation::{self, Check};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInput {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
}

impl Check for ModuleInput {
    fn check(&self) -> Result<()> {
        validation::required_max("name", &self.name, 100)?;
        validation::optional_max("description", self.description.as_deref(), 1000)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub order: i32,
    /// Minutes
    #[serde(default)]
    pub total_time: i32,
    pub parent_topic_id: Option<Uuid>,
}

impl Check for TopicInput {
    fn check(&self) -> Result<()> {
        validation::required_max("name", &self.name, 100)?;
        validation::range("order", self.order, 1, 1000)?;
        validation::range("totalTime", self.total_time, 1, 600)?;
        if let Some(parent) = self.parent_topic_id {
            validation::id("parentTopicId", parent)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleFilter {
    pub search: Option<String>,
}

/// Topic with its sub-topics, both in teaching order
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicView {
    pub id: Uuid,
    pub name: String,
    pub order: i32,
    pub total_time: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_topics: Vec<TopicView>,
}

impl From<&ModuleTopic> for TopicView {
    fn from(topic: &ModuleTopic) -> Self {
        Self {
            id: topic.id,
            name: topic.name.clone(),
            order: topic.topic_order,
            total_time: topic.total_time,
            sub_topics: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct CourseService {
    db: DbPool,
}

impl CourseService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    // ========================================================================
    // Modules
    // ========================================================================

    pub async fn add_module(
        &self,
        tenant_id: Uuid,
        actor: Uuid,
        input: &ModuleInput,
    ) -> Result<Uuid> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;

        let module = CourseModuleActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            name: Set(input.name.trim().to_string()),
            description: Set(input.description.clone()),
            created_by: Set(actor),
            created_at: Set(now()),
            updated_by: Set(None),
            updated_at: Set(None),
            deleted_by: Set(None),
            deleted_at: Set(None),
        }
        .insert(conn)
        .await?;

        record_mutation("module", "add");
        info!(tenant_id = %tenant_id, module_id = %module.id, "Module added");
        Ok(module.id)
    }

    pub async fn update_module(
        &self,
        tenant_id: Uuid,
        module_id: Uuid,
        actor: Uuid,
        input: &ModuleInput,
    ) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;

        let mut module: CourseModuleActiveModel =
            repository::find::<CourseModuleEntity, _>(conn, tenant_id, module_id).await?.into();
        module.name = Set(input.name.trim().to_string());
        module.description = Set(input.description.clone());
        module.updated_by = Set(Some(actor));
        module.updated_at = Set(Some(now()));
        module.update(conn).await?;

        record_mutation("module", "update");
        info!(tenant_id = %tenant_id, module_id = %module_id, "Module updated");
        Ok(())
    }

    /// Soft-delete a module and all of its topics
    pub async fn delete_module(&self, tenant_id: Uuid, module_id: Uuid, actor: Uuid) -> Result<()> {
        let txn = self.db.begin().await?;
        repository::ensure_tenant(&txn, tenant_id).await?;

        repository::soft_delete::<CourseModuleEntity, _>(&txn, tenant_id, module_id, actor).await?;
        repository::soft_delete_where::<ModuleTopicEntity, _, _>(
            &txn,
            tenant_id,
            ModuleTopicColumn::ModuleId.eq(module_id),
            actor,
        )
        .await?;
        txn.commit().await?;

        record_mutation("module", "delete");
        info!(tenant_id = %tenant_id, module_id = %module_id, "Module deleted");
        Ok(())
    }

    pub async fn get_module(&self, tenant_id: Uuid, module_id: Uuid) -> Result<CourseModule> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::find::<CourseModuleEntity, _>(conn, tenant_id, module_id).await
    }

    pub async fn get_module_list(
        &self,
        tenant_id: Uuid,
        filter: &ModuleFilter,
        page: Page,
    ) -> Result<Paged<CourseModule>> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;

        let mut query = CourseModuleEntity::scoped(tenant_id);
        if let Some(ref term) = filter.search {
            query = query.filter(search_condition(&[CourseModuleColumn::Name], term));
        }

        repository::fetch_page(conn, query, page).await
    }

    // ========================================================================
    // Topics
    // ========================================================================

    pub async fn add_topic(
        &self,
        tenant_id: Uuid,
        module_id: Uuid,
        actor: Uuid,
        input: &TopicInput,
    ) -> Result<Uuid> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::ensure_exists::<CourseModuleEntity, _>(conn, tenant_id, module_id).await?;
        check_parent(conn, tenant_id, module_id, None, input.parent_topic_id).await?;

        let topic = ModuleTopicActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            module_id: Set(module_id),
            parent_topic_id: Set(input.parent_topic_id),
            name: Set(input.name.trim().to_string()),
            topic_order: Set(input.order),
            total_time: Set(input.total_time),
            created_by: Set(actor),
            created_at: Set(now()),
            updated_by: Set(None),
            updated_at: Set(None),
            deleted_by: Set(None),
            deleted_at: Set(None),
        }
        .insert(conn)
        .await?;

        record_mutation("topic", "add");
        info!(tenant_id = %tenant_id, module_id = %module_id, topic_id = %topic.id, "Topic added");
        Ok(topic.id)
    }

    pub async fn update_topic(
        &self,
        tenant_id: Uuid,
        module_id: Uuid,
        topic_id: Uuid,
        actor: Uuid,
        input: &TopicInput,
    ) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;

        let existing = find_topic(conn, tenant_id, module_id, topic_id).await?;
        check_parent(conn, tenant_id, module_id, Some(topic_id), input.parent_topic_id).await?;

        let mut topic: ModuleTopicActiveModel = existing.into();
        topic.name = Set(input.name.trim().to_string());
        topic.topic_order = Set(input.order);
        topic.total_time = Set(input.total_time);
        topic.parent_topic_id = Set(input.parent_topic_id);
        topic.updated_by = Set(Some(actor));
        topic.updated_at = Set(Some(now()));
        topic.update(conn).await?;

        record_mutation("topic", "update");
        info!(tenant_id = %tenant_id, topic_id = %topic_id, "Topic updated");
        Ok(())
    }

    /// Soft-delete a topic and its sub-topics
    pub async fn delete_topic(
        &self,
        tenant_id: Uuid,
        module_id: Uuid,
        topic_id: Uuid,
        actor: Uuid,
    ) -> Result<()> {
        let txn = self.db.begin().await?;
        repository::ensure_tenant(&txn, tenant_id).await?;

        find_topic(&txn, tenant_id, module_id, topic_id).await?;
        repository::soft_delete::<ModuleTopicEntity, _>(&txn, tenant_id, topic_id, actor).await?;
        repository::soft_delete_where::<ModuleTopicEntity, _, _>(
            &txn,
            tenant_id,
            ModuleTopicColumn::ParentTopicId.eq(topic_id),
            actor,
        )
        .await?;
        txn.commit().await?;

        record_mutation("topic", "delete");
        info!(tenant_id = %tenant_id, topic_id = %topic_id, "Topic deleted");
        Ok(())
    }

    /// Topics of a module in order, sub-topics nested under their parent
    pub async fn get_topic_list(&self, tenant_id: Uuid, module_id: Uuid) -> Result<Vec<TopicView>> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::ensure_exists::<CourseModuleEntity, _>(conn, tenant_id, module_id).await?;

        let topics = topics_of(conn, tenant_id, module_id).await?;
        Ok(topic_tree(&topics))
    }
}

/// Teaching units of the given modules, in module order then topic order
///
/// A topic with sub-topics contributes one unit per sub-topic, a topic
/// without sub-topics is a unit itself.
pub(crate) async fn teaching_units<C>(
    conn: &C,
    tenant_id: Uuid,
    module_ids: &[Uuid],
) -> Result<Vec<Unit>>
where
    C: ConnectionTrait,
{
    let mut units = Vec::new();

    for module_id in module_ids {
        let topics = topics_of(conn, tenant_id, *module_id).await?;

        for topic in topics.iter().filter(|t| t.parent_topic_id.is_none()) {
            let subs: Vec<&ModuleTopic> = topics
                .iter()
                .filter(|t| t.parent_topic_id == Some(topic.id))
                .collect();

            if subs.is_empty() {
                units.push(unit(*module_id, topic.id, None, topic.total_time));
            } else {
                for sub in subs {
                    units.push(unit(*module_id, topic.id, Some(sub.id), sub.total_time));
                }
            }
        }
    }

    Ok(units)
}

fn unit(module_id: Uuid, topic_id: Uuid, sub_topic_id: Option<Uuid>, minutes: i32) -> Unit {
    Unit {
        module_id,
        topic_id,
        sub_topic_id,
        minutes: u32::try_from(minutes).unwrap_or(0),
    }
}

fn topic_tree(topics: &[ModuleTopic]) -> Vec<TopicView> {
    topics
        .iter()
        .filter(|t| t.parent_topic_id.is_none())
        .map(|topic| {
            let mut view = TopicView::from(topic);
            view.sub_topics = topics
                .iter()
                .filter(|t| t.parent_topic_id == Some(topic.id))
                .map(TopicView::from)
                .collect();
            view
        })
        .collect()
}

/// Live topics of a module ordered by position
async fn topics_of<C>(conn: &C, tenant_id: Uuid, module_id: Uuid) -> Result<Vec<ModuleTopic>>
where
    C: ConnectionTrait,
{
    ModuleTopicEntity::scoped(tenant_id)
        .filter(ModuleTopicColumn::ModuleId.eq(module_id))
        .order_by_asc(ModuleTopicColumn::TopicOrder)
        .order_by_asc(ModuleTopicColumn::CreatedAt)
        .all(conn)
        .await
        .map_err(Into::into)
}

async fn find_topic<C>(
    conn: &C,
    tenant_id: Uuid,
    module_id: Uuid,
    topic_id: Uuid,
) -> Result<ModuleTopic>
where
    C: ConnectionTrait,
{
    let topic = repository::find::<ModuleTopicEntity, _>(conn, tenant_id, topic_id).await?;
    if topic.module_id != module_id {
        return Err(AppError::not_found("topic", topic_id));
    }
    Ok(topic)
}

/// A parent must be a top-level topic of the same module, other than the
/// topic itself. A topic that has sub-topics of its own cannot be nested.
async fn check_parent<C>(
    conn: &C,
    tenant_id: Uuid,
    module_id: Uuid,
    topic_id: Option<Uuid>,
    parent_id: Option<Uuid>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let Some(parent_id) = parent_id else {
        return Ok(());
    };

    if Some(parent_id) == topic_id {
        return Err(AppError::validation("parentTopicId", "a topic cannot be its own parent"));
    }

    let parent = ModuleTopicEntity::scoped_by_id(tenant_id, parent_id).one(conn).await?;
    match parent {
        Some(parent) if parent.module_id == module_id && parent.parent_topic_id.is_none() => {}
        Some(_) => {
            return Err(AppError::validation(
                "parentTopicId",
                "parentTopicId must be a top-level topic of the same module",
            ))
        }
        None => return Err(AppError::not_found("topic", parent_id)),
    }

    if let Some(topic_id) = topic_id {
        let children = ModuleTopicEntity::scoped(tenant_id)
            .filter(ModuleTopicColumn::ParentTopicId.eq(topic_id))
            .count(conn)
            .await?;
        if children > 0 {
            return Err(AppError::validation(
                "parentTopicId",
                "a topic with sub-topics cannot become a sub-topic",
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::setup;

    fn topic(name: &str, order: i32, minutes: i32, parent: Option<Uuid>) -> TopicInput {
        TopicInput {
            name: name.to_string(),
            order,
            total_time: minutes,
            parent_topic_id: parent,
        }
    }

    #[test]
    fn test_check_topic_bounds() {
        assert!(topic("Ownership", 1, 90, None).check().is_ok());
        assert!(topic("Ownership", 0, 90, None).check().is_err());
        assert!(topic("Ownership", 1, 601, None).check().is_err());
        assert!(topic("Ownership", 1, 60, Some(Uuid::nil())).check().is_err());
    }

    #[tokio::test]
    async fn test_topic_tree_and_units() {
        let (db, tenant_id) = setup().await;
        let service = CourseService::new(db.clone());
        let actor = Uuid::new_v4();

        let module = ModuleInput {
            name: "Rust basics".to_string(),
            description: None,
        };
        let module_id = service.add_module(tenant_id, actor, &module).await.unwrap();

        let second = service
            .add_topic(tenant_id, module_id, actor, &topic("Traits", 2, 60, None))
            .await
            .unwrap();
        let first = service
            .add_topic(tenant_id, module_id, actor, &topic("Ownership", 1, 90, None))
            .await
            .unwrap();
        let sub = service
            .add_topic(tenant_id, module_id, actor, &topic("Generics", 1, 30, Some(second)))
            .await
            .unwrap();

        let tree = service.get_topic_list(tenant_id, module_id).await.unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].id, first);
        assert_eq!(tree[1].sub_topics[0].id, sub);

        let units = teaching_units(db.read(), tenant_id, &[module_id]).await.unwrap();
        assert_eq!(units.len(), 2);
        assert_eq!((units[0].topic_id, units[0].sub_topic_id, units[0].minutes), (first, None, 90));
        assert_eq!((units[1].topic_id, units[1].sub_topic_id, units[1].minutes), (second, Some(sub), 30));
    }

    #[tokio::test]
    async fn test_parent_must_be_same_module() {
        let (db, tenant_id) = setup().await;
        let service = CourseService::new(db);
        let actor = Uuid::new_v4();
        let module = ModuleInput {
            name: "A".to_string(),
            description: None,
        };
        let a = service.add_module(tenant_id, actor, &module).await.unwrap();
        let b = service.add_module(tenant_id, actor, &module).await.unwrap();
        let parent = service.add_topic(tenant_id, a, actor, &topic("T", 1, 30, None)).await.unwrap();

        let err = service
            .add_topic(tenant_id, b, actor, &topic("S", 1, 30, Some(parent)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_topic_with_sub_topics_cannot_be_nested() {
        let (db, tenant_id) = setup().await;
        let service = CourseService::new(db.clone());
        let actor = Uuid::new_v4();
        let module = ModuleInput {
            name: "Rust basics".to_string(),
            description: None,
        };
        let module_id = service.add_module(tenant_id, actor, &module).await.unwrap();

        let ownership = service
            .add_topic(tenant_id, module_id, actor, &topic("Ownership", 1, 30, None))
            .await
            .unwrap();
        let traits = service
            .add_topic(tenant_id, module_id, actor, &topic("Traits", 2, 60, None))
            .await
            .unwrap();
        for (name, order) in [("Generics", 1), ("Objects", 2)] {
            service
                .add_topic(tenant_id, module_id, actor, &topic(name, order, 30, Some(traits)))
                .await
                .unwrap();
        }

        let err = service
            .update_topic(tenant_id, module_id, traits, actor, &topic("Traits", 2, 60, Some(ownership)))
            .await
            .unwrap_err();
        match err {
            AppError::Validation { field, .. } => assert_eq!(field.as_deref(), Some("parentTopicId")),
            other => panic!("unexpected error: {:?}", other),
        }

        let units = teaching_units(db.read(), tenant_id, &[module_id]).await.unwrap();
        assert_eq!(units.len(), 3);
        assert_eq!(units.iter().map(|u| u.minutes).sum::<u32>(), 90);

        let tree = service.get_topic_list(tenant_id, module_id).await.unwrap();
        assert_eq!(tree[1].sub_topics.len(), 2);

        // A leaf topic can still move under another top-level topic
        let leaf = service
            .add_topic(tenant_id, module_id, actor, &topic("Borrowing", 3, 20, None))
            .await
            .unwrap();
        service
            .update_topic(tenant_id, module_id, leaf, actor, &topic("Borrowing", 1, 20, Some(ownership)))
            .await
            .unwrap();
    }
}
