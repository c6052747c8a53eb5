//! Schema bootstrap from the entity definitions

use crate::db::models::*;
use crate::errors::Result;
use sea_orm::{ConnectionTrait, EntityTrait, Schema};
use tracing::info;

/// Create every table that does not exist yet
///
/// Tables are created parents first so foreign keys resolve.
pub async fn create_tables<C>(conn: &C) -> Result<()>
where
    C: ConnectionTrait,
{
    create(conn, TenantEntity).await?;
    create(conn, TalentEntity).await?;
    create(conn, EnquiryEntity).await?;
    create(conn, BatchEntity).await?;
    create(conn, BatchTimingEntity).await?;
    create(conn, BatchTalentEntity).await?;
    create(conn, CourseModuleEntity).await?;
    create(conn, ModuleTopicEntity).await?;
    create(conn, BatchModuleEntity).await?;
    create(conn, BatchSessionEntity).await?;
    create(conn, SessionTopicEntity).await?;
    create(conn, FeedbackEntity).await?;
    create(conn, NotificationEntity).await?;
    create(conn, DiscussionEntity).await?;
    create(conn, ReplyEntity).await?;
    create(conn, InterviewEntity).await?;
    create(conn, WaitingListEntity).await?;
    create(conn, AssignmentEntity).await?;

    info!("Database schema is up to date");
    Ok(())
}

async fn create<C, E>(conn: &C, entity: E) -> Result<()>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = conn.get_database_backend();
    let mut statement = Schema::new(backend).create_table_from_entity(entity);
    statement.if_not_exists();

    conn.execute(backend.build(&statement)).await?;
    Ok(())
}
