//! Tenant-scoped data access helpers
//!
//! Every query issued by a service goes through the helpers in this module
//! so that two rules hold everywhere:
//! - rows are only visible to the tenant that owns them
//! - soft-deleted rows (`deleted_at IS NOT NULL`) are never returned
//!
//! Helpers are generic over [`ConnectionTrait`] so the same call works on a
//! pooled connection and inside a transaction.

use crate::db::models::{Tenant, TenantActiveModel, TenantColumn, TenantEntity};
use crate::errors::{AppError, Result};
use crate::pagination::{Page, Paged};
use chrono::Utc;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, IntoCondition};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set, UpdateMany,
};
use uuid::Uuid;

/// An entity carrying the standard tenant envelope
pub trait TenantScoped: EntityTrait {
    /// Name used in NotFound errors
    const RESOURCE: &'static str;

    fn id_column() -> Self::Column;
    fn tenant_column() -> Self::Column;
    fn created_at_column() -> Self::Column;
    fn deleted_by_column() -> Self::Column;
    fn deleted_at_column() -> Self::Column;

    /// Live rows of one tenant
    fn scoped(tenant_id: Uuid) -> Select<Self> {
        Self::find()
            .filter(Self::tenant_column().eq(tenant_id))
            .filter(Self::deleted_at_column().is_null())
    }

    /// Live row of one tenant by id
    fn scoped_by_id(tenant_id: Uuid, id: Uuid) -> Select<Self> {
        Self::scoped(tenant_id).filter(Self::id_column().eq(id))
    }

    /// Soft-delete statement over the live rows of one tenant
    fn soft_delete_query(tenant_id: Uuid, deleted_by: Uuid) -> UpdateMany<Self> {
        Self::update_many()
            .col_expr(Self::deleted_by_column(), Expr::value(deleted_by))
            .col_expr(Self::deleted_at_column(), Expr::value(now()))
            .filter(Self::tenant_column().eq(tenant_id))
            .filter(Self::deleted_at_column().is_null())
    }
}

/// Current timestamp in the form stored by the envelope columns
pub fn now() -> DateTimeWithTimeZone {
    Utc::now().fixed_offset()
}

// ============================================================================
// Tenant
// ============================================================================

/// Fail with NotFound unless the tenant exists and is active
pub async fn ensure_tenant<C>(conn: &C, tenant_id: Uuid) -> Result<()>
where
    C: ConnectionTrait,
{
    let found = TenantEntity::find_by_id(tenant_id)
        .filter(TenantColumn::IsActive.eq(true))
        .one(conn)
        .await?;

    match found {
        Some(_) => Ok(()),
        None => Err(AppError::not_found("tenant", tenant_id)),
    }
}

/// Register a new active tenant
pub async fn insert_tenant<C>(conn: &C, name: &str) -> Result<Tenant>
where
    C: ConnectionTrait,
{
    let now = now();
    let tenant = TenantActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };

    tenant.insert(conn).await.map_err(Into::into)
}

// ============================================================================
// Reads
// ============================================================================

/// Find a live row of the tenant, or NotFound
pub async fn find<E, C>(conn: &C, tenant_id: Uuid, id: Uuid) -> Result<E::Model>
where
    E: TenantScoped,
    C: ConnectionTrait,
{
    E::scoped_by_id(tenant_id, id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found(E::RESOURCE, id))
}

/// Fail with NotFound unless a live row of the tenant exists
pub async fn ensure_exists<E, C>(conn: &C, tenant_id: Uuid, id: Uuid) -> Result<()>
where
    E: TenantScoped,
    E::Model: Sync,
    C: ConnectionTrait,
{
    let count = E::scoped_by_id(tenant_id, id).count(conn).await?;
    if count == 0 {
        return Err(AppError::not_found(E::RESOURCE, id));
    }
    Ok(())
}

/// Fetch one page of an already filtered query, newest first
///
/// The total is counted over the whole filtered set so it does not depend
/// on the requested window.
pub async fn fetch_page<E, C>(conn: &C, query: Select<E>, page: Page) -> Result<Paged<E::Model>>
where
    E: TenantScoped,
    E::Model: Sync,
    C: ConnectionTrait,
{
    let total = query.clone().count(conn).await?;
    let items = query
        .order_by_desc(E::created_at_column())
        .offset(page.offset)
        .limit(page.limit)
        .all(conn)
        .await?;

    Ok(Paged::new(items, total))
}

// ============================================================================
// Writes
// ============================================================================

/// Soft-delete a single live row, NotFound when nothing was deleted
pub async fn soft_delete<E, C>(conn: &C, tenant_id: Uuid, id: Uuid, deleted_by: Uuid) -> Result<()>
where
    E: TenantScoped,
    C: ConnectionTrait,
{
    let result = E::soft_delete_query(tenant_id, deleted_by)
        .filter(E::id_column().eq(id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::not_found(E::RESOURCE, id));
    }
    Ok(())
}

/// Soft-delete every live row of the tenant matching `condition`
///
/// Returns the number of rows deleted; zero is not an error.
pub async fn soft_delete_where<E, C, F>(
    conn: &C,
    tenant_id: Uuid,
    condition: F,
    deleted_by: Uuid,
) -> Result<u64>
where
    E: TenantScoped,
    C: ConnectionTrait,
    F: IntoCondition,
{
    let result = E::soft_delete_query(tenant_id, deleted_by)
        .filter(condition)
        .exec(conn)
        .await?;

    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{TalentColumn, TalentEntity};
    use sea_orm::{DbBackend, QueryTrait};

    #[test]
    fn test_scoped_select_filters_tenant_and_deleted() {
        let tenant_id = Uuid::nil();
        let sql = TalentEntity::scoped(tenant_id)
            .build(DbBackend::Postgres)
            .to_string();

        assert!(sql.contains(r#""talents"."tenant_id" = '00000000-0000-0000-0000-000000000000'"#));
        assert!(sql.contains(r#""talents"."deleted_at" IS NULL"#));
    }

    #[test]
    fn test_soft_delete_sets_envelope_columns() {
        let sql = TalentEntity::soft_delete_query(Uuid::nil(), Uuid::nil())
            .filter(TalentColumn::Id.eq(Uuid::nil()))
            .build(DbBackend::Postgres)
            .to_string();

        assert!(sql.starts_with(r#"UPDATE "talents" SET "deleted_by""#));
        assert!(sql.contains(r#""deleted_at" IS NULL"#));
        assert!(!sql.contains("DELETE"));
    }
}
