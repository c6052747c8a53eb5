//! Notifications addressed to a credential

use sea_orm::{ActiveModelTrait, ColumnTrait, PaginatorTrait, QueryFilter, Set};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::models::{
    Notification, NotificationActiveModel, NotificationColumn, NotificationEntity,
    NotificationType,
};
use crate::db::repository::{self, now, TenantScoped};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::metrics::record_mutation;
use crate::pagination::{Page, Paged};
use crate::validation::{self, Check};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationInput {
    /// Recipient
    #[serde(default)]
    pub credential_id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notification_type: String,
}

impl Check for NotificationInput {
    fn check(&self) -> Result<()> {
        validation::id("credentialId", self.credential_id)?;
        validation::required_max("title", &self.title, 200)?;
        validation::required_max("description", &self.description, 2000)?;
        validation::one_of::<NotificationType>("notificationType", &self.notification_type)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFilter {
    pub is_seen: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct NotificationList {
    pub page: Paged<Notification>,
    pub unseen_count: u64,
}

#[derive(Clone)]
pub struct NotificationService {
    db: DbPool,
}

impl NotificationService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn add_notification(
        &self,
        tenant_id: Uuid,
        actor: Uuid,
        input: &NotificationInput,
    ) -> Result<Uuid> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;

        let notification = NotificationActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            credential_id: Set(input.credential_id),
            title: Set(input.title.trim().to_string()),
            description: Set(input.description.clone()),
            notification_type: Set(input.notification_type.clone()),
            is_seen: Set(false),
            seen_at: Set(None),
            created_by: Set(actor),
            created_at: Set(now()),
            updated_by: Set(None),
            updated_at: Set(None),
            deleted_by: Set(None),
            deleted_at: Set(None),
        }
        .insert(conn)
        .await?;

        record_mutation("notification", "add");
        info!(
            tenant_id = %tenant_id,
            notification_id = %notification.id,
            recipient = %input.credential_id,
            "Notification added"
        );
        Ok(notification.id)
    }

    /// Mark a notification seen; only its recipient may do so
    pub async fn mark_notification_seen(
        &self,
        tenant_id: Uuid,
        notification_id: Uuid,
        actor: Uuid,
    ) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;

        let existing =
            repository::find::<NotificationEntity, _>(conn, tenant_id, notification_id).await?;
        if existing.credential_id != actor {
            warn!(
                tenant_id = %tenant_id,
                notification_id = %notification_id,
                actor = %actor,
                "Notification marked by someone other than its recipient"
            );
            return Err(AppError::forbidden("only the recipient may mark a notification as seen"));
        }
        if existing.is_seen {
            return Ok(());
        }

        let stamp = now();
        let mut notification: NotificationActiveModel = existing.into();
        notification.is_seen = Set(true);
        notification.seen_at = Set(Some(stamp));
        notification.updated_by = Set(Some(actor));
        notification.updated_at = Set(Some(stamp));
        notification.update(conn).await?;

        record_mutation("notification", "seen");
        info!(tenant_id = %tenant_id, notification_id = %notification_id, "Notification seen");
        Ok(())
    }

    pub async fn delete_notification(
        &self,
        tenant_id: Uuid,
        notification_id: Uuid,
        actor: Uuid,
    ) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::soft_delete::<NotificationEntity, _>(conn, tenant_id, notification_id, actor)
            .await?;

        record_mutation("notification", "delete");
        info!(tenant_id = %tenant_id, notification_id = %notification_id, "Notification deleted");
        Ok(())
    }

    /// Notifications addressed to `recipient`, newest first
    pub async fn get_notification_list(
        &self,
        tenant_id: Uuid,
        recipient: Uuid,
        filter: &NotificationFilter,
        page: Page,
    ) -> Result<NotificationList> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;

        let own = NotificationEntity::scoped(tenant_id)
            .filter(NotificationColumn::CredentialId.eq(recipient));

        let unseen_count = own
            .clone()
            .filter(NotificationColumn::IsSeen.eq(false))
            .count(conn)
            .await?;

        let mut query = own;
        if let Some(seen) = filter.is_seen {
            query = query.filter(NotificationColumn::IsSeen.eq(seen));
        }
        let page = repository::fetch_page(conn, query, page).await?;

        Ok(NotificationList { page, unseen_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::setup;

    fn notice(recipient: Uuid) -> NotificationInput {
        NotificationInput {
            credential_id: recipient,
            title: "Batch starts Monday".to_string(),
            description: "Bring a laptop".to_string(),
            notification_type: "batch".to_string(),
        }
    }

    #[test]
    fn test_type_must_be_known() {
        let mut input = notice(Uuid::new_v4());
        input.notification_type = "memo".to_string();
        let err = input.check().unwrap_err();
        assert!(
            matches!(err, AppError::Validation { ref field, .. } if field.as_deref() == Some("notificationType"))
        );
    }

    #[tokio::test]
    async fn test_only_recipient_marks_seen() {
        let (db, tenant_id) = setup().await;
        let service = NotificationService::new(db);
        let recipient = Uuid::new_v4();
        let id = service.add_notification(tenant_id, Uuid::new_v4(), &notice(recipient)).await.unwrap();

        let err = service.mark_notification_seen(tenant_id, id, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden { .. }));

        service.mark_notification_seen(tenant_id, id, recipient).await.unwrap();
        let list = service
            .get_notification_list(tenant_id, recipient, &NotificationFilter::default(), Page::default())
            .await
            .unwrap();
        assert_eq!(list.unseen_count, 0);
        assert!(list.page.items[0].is_seen);
        assert!(list.page.items[0].seen_at.is_some());
    }

    #[tokio::test]
    async fn test_list_is_limited_to_recipient() {
        let (db, tenant_id) = setup().await;
        let service = NotificationService::new(db);
        let me = Uuid::new_v4();
        let sender = Uuid::new_v4();

        service.add_notification(tenant_id, sender, &notice(me)).await.unwrap();
        service.add_notification(tenant_id, sender, &notice(me)).await.unwrap();
        service.add_notification(tenant_id, sender, &notice(Uuid::new_v4())).await.unwrap();

        let list = service
            .get_notification_list(tenant_id, me, &NotificationFilter { is_seen: Some(false) }, Page::default())
            .await
            .unwrap();
        assert_eq!(list.page.total, 2);
        assert_eq!(list.unseen_count, 2);
    }
}
