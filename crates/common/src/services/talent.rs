//! Talent service

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, PaginatorTrait, QueryFilter, QuerySelect, Set,
};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::models::{AcademicYear, Talent, TalentActiveModel, TalentColumn, TalentEntity};
use crate::db::repository::{self, now, TenantScoped};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::metrics::{record_bulk_rejections, record_mutation};
use crate::pagination::{Page, Paged};
use crate::services::{search_condition, BulkOutcome};
use crate::validation::{self, Check};

/// Talent fields accepted on add and update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalentInput {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub academic_year: String,
    pub college: Option<String>,
    pub experience_years: Option<i32>,
    pub lifetime_value: Option<f64>,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Check for TalentInput {
    fn check(&self) -> Result<()> {
        validation::required_max("firstName", &self.first_name, 50)?;
        validation::required_max("lastName", &self.last_name, 50)?;
        validation::email("email", &self.email)?;
        validation::contact("contact", &self.contact)?;
        validation::one_of::<AcademicYear>("academicYear", &self.academic_year)?;
        validation::optional_max("college", self.college.as_deref(), 100)?;
        if let Some(years) = self.experience_years {
            validation::range("experienceYears", years, 0, 50)?;
        }
        if let Some(value) = self.lifetime_value {
            if value < 0.0 {
                return Err(AppError::validation(
                    "lifetimeValue",
                    "lifetimeValue must not be negative",
                ));
            }
        }
        Ok(())
    }
}

/// Optional filters of the talent list
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TalentFilter {
    pub search: Option<String>,
    pub is_active: Option<bool>,
    pub academic_year: Option<AcademicYear>,
}

/// One page of talents plus the lifetime value of the whole filtered set
#[derive(Debug, Clone)]
pub struct TalentList {
    pub page: Paged<Talent>,
    pub total_lifetime_value: f64,
}

#[derive(Clone)]
pub struct TalentService {
    db: DbPool,
}

impl TalentService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Add a single talent, rejecting an email already used in the tenant
    pub async fn add_talent(
        &self,
        tenant_id: Uuid,
        actor: Uuid,
        input: &TalentInput,
    ) -> Result<Uuid> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;

        let email = normalize_email(&input.email);
        if email_taken(conn, tenant_id, &email, None).await? {
            return Err(AppError::Duplicate {
                message: format!("talent with email {} already exists", email),
            });
        }

        let talent = insert(conn, tenant_id, actor, input).await?;
        record_mutation("talent", "add");

        info!(tenant_id = %tenant_id, talent_id = %talent.id, "Talent added");
        Ok(talent.id)
    }

    /// Add talents one by one; records that clash on email are reported,
    /// not fatal
    pub async fn add_talents(
        &self,
        tenant_id: Uuid,
        actor: Uuid,
        inputs: &[TalentInput],
    ) -> Result<BulkOutcome> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;

        let mut outcome = BulkOutcome::default();
        let mut seen = HashSet::new();

        for (index, input) in inputs.iter().enumerate() {
            let email = normalize_email(&input.email);

            if !seen.insert(email.clone()) {
                outcome.reject(index, &email, "email repeated in request");
                continue;
            }
            if email_taken(conn, tenant_id, &email, None).await? {
                outcome.reject(index, &email, "email already registered");
                continue;
            }

            match insert(conn, tenant_id, actor, input).await {
                Ok(_) => outcome.added_count += 1,
                Err(AppError::Duplicate { message }) => outcome.reject(index, &email, message),
                Err(err) => return Err(err),
            }
        }

        record_bulk_rejections("talent", outcome.errors.len());
        info!(
            tenant_id = %tenant_id,
            added = outcome.added_count,
            rejected = outcome.errors.len(),
            "Talents added in bulk"
        );
        Ok(outcome)
    }

    pub async fn update_talent(
        &self,
        tenant_id: Uuid,
        talent_id: Uuid,
        actor: Uuid,
        input: &TalentInput,
    ) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;

        let existing = repository::find::<TalentEntity, _>(conn, tenant_id, talent_id).await?;

        let email = normalize_email(&input.email);
        if email != existing.email && email_taken(conn, tenant_id, &email, Some(talent_id)).await? {
            return Err(AppError::Duplicate {
                message: format!("talent with email {} already exists", email),
            });
        }

        let mut talent: TalentActiveModel = existing.into();
        talent.first_name = Set(input.first_name.trim().to_string());
        talent.last_name = Set(input.last_name.trim().to_string());
        talent.email = Set(email);
        talent.contact = Set(input.contact.clone());
        talent.academic_year = Set(input.academic_year.clone());
        talent.college = Set(input.college.clone());
        talent.experience_years = Set(input.experience_years);
        talent.lifetime_value = Set(input.lifetime_value);
        talent.is_active = Set(input.is_active);
        talent.updated_by = Set(Some(actor));
        talent.updated_at = Set(Some(now()));
        talent.update(conn).await?;

        record_mutation("talent", "update");
        info!(tenant_id = %tenant_id, talent_id = %talent_id, "Talent updated");
        Ok(())
    }

    pub async fn delete_talent(&self, tenant_id: Uuid, talent_id: Uuid, actor: Uuid) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::soft_delete::<TalentEntity, _>(conn, tenant_id, talent_id, actor).await?;

        record_mutation("talent", "delete");
        info!(tenant_id = %tenant_id, talent_id = %talent_id, "Talent deleted");
        Ok(())
    }

    pub async fn get_talent(&self, tenant_id: Uuid, talent_id: Uuid) -> Result<Talent> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::find::<TalentEntity, _>(conn, tenant_id, talent_id).await
    }

    pub async fn get_talent_list(
        &self,
        tenant_id: Uuid,
        filter: &TalentFilter,
        page: Page,
    ) -> Result<TalentList> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;

        let mut query = TalentEntity::scoped(tenant_id);
        if let Some(ref term) = filter.search {
            query = query.filter(search_condition(
                &[TalentColumn::FirstName, TalentColumn::LastName, TalentColumn::Email],
                term,
            ));
        }
        if let Some(active) = filter.is_active {
            query = query.filter(TalentColumn::IsActive.eq(active));
        }
        if let Some(year) = filter.academic_year {
            query = query.filter(TalentColumn::AcademicYear.eq(year.as_str()));
        }

        let total_lifetime_value = query
            .clone()
            .select_only()
            .column_as(TalentColumn::LifetimeValue.sum(), "total")
            .into_tuple::<Option<f64>>()
            .one(conn)
            .await?
            .flatten()
            .unwrap_or(0.0);

        let page = repository::fetch_page(conn, query, page).await?;

        Ok(TalentList {
            page,
            total_lifetime_value,
        })
    }
}

/// Insert a talent row; the caller has already checked the email
pub(crate) async fn insert<C>(
    conn: &C,
    tenant_id: Uuid,
    actor: Uuid,
    input: &TalentInput,
) -> Result<Talent>
where
    C: ConnectionTrait,
{
    let talent = TalentActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        first_name: Set(input.first_name.trim().to_string()),
        last_name: Set(input.last_name.trim().to_string()),
        email: Set(normalize_email(&input.email)),
        contact: Set(input.contact.clone()),
        academic_year: Set(input.academic_year.clone()),
        college: Set(input.college.clone()),
        experience_years: Set(input.experience_years),
        lifetime_value: Set(input.lifetime_value),
        is_active: Set(input.is_active),
        created_by: Set(actor),
        created_at: Set(now()),
        updated_by: Set(None),
        updated_at: Set(None),
        deleted_by: Set(None),
        deleted_at: Set(None),
    };

    talent.insert(conn).await.map_err(Into::into)
}

/// Whether a live talent of the tenant already uses `email`
pub(crate) async fn email_taken<C>(
    conn: &C,
    tenant_id: Uuid,
    email: &str,
    except: Option<Uuid>,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let mut query = TalentEntity::scoped(tenant_id).filter(TalentColumn::Email.eq(email));
    if let Some(id) = except {
        query = query.filter(TalentColumn::Id.ne(id));
    }

    let count = query.count(conn).await?;
    if count > 0 {
        warn!(tenant_id = %tenant_id, email = %email, "Talent email already registered");
    }
    Ok(count > 0)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::setup;

    fn talent(first: &str, email: &str) -> TalentInput {
        TalentInput {
            first_name: first.to_string(),
            last_name: "Rao".to_string(),
            email: email.to_string(),
            contact: "9876543210".to_string(),
            academic_year: "graduate".to_string(),
            college: None,
            experience_years: Some(1),
            lifetime_value: Some(1500.0),
            is_active: true,
        }
    }

    #[test]
    fn test_check_reports_first_failing_rule() {
        let mut input = talent("", "bad");
        let err = input.check().unwrap_err();
        assert_eq!(err.to_string(), "firstName must be specified");

        input.first_name = "Asha".to_string();
        assert_eq!(input.check().unwrap_err().to_string(), "email must be a valid email address");

        input.email = "a@x.com".to_string();
        input.academic_year = "phd".to_string();
        assert!(input.check().unwrap_err().to_string().starts_with("academicYear"));
    }

    #[test]
    fn test_check_rejects_negative_lifetime_value() {
        let mut input = talent("Asha", "a@x.com");
        input.lifetime_value = Some(-1.0);
        assert!(input.check().is_err());
    }

    #[tokio::test]
    async fn test_add_and_get_sets_creator() {
        let (db, tenant_id) = setup().await;
        let service = TalentService::new(db);
        let actor = Uuid::new_v4();

        let id = service.add_talent(tenant_id, actor, &talent("Asha", "A@X.com")).await.unwrap();
        let stored = service.get_talent(tenant_id, id).await.unwrap();

        assert_eq!(stored.created_by, actor);
        assert_eq!(stored.tenant_id, tenant_id);
        assert_eq!(stored.email, "a@x.com");
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let (db, tenant_id) = setup().await;
        let service = TalentService::new(db);
        let actor = Uuid::new_v4();

        service.add_talent(tenant_id, actor, &talent("Asha", "a@x.com")).await.unwrap();
        let err = service
            .add_talent(tenant_id, actor, &talent("Asha", "a@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn test_bulk_add_reports_duplicates() {
        let (db, tenant_id) = setup().await;
        let service = TalentService::new(db);
        let actor = Uuid::new_v4();
        service.add_talent(tenant_id, actor, &talent("Asha", "a@x.com")).await.unwrap();

        let inputs = vec![
            talent("Bina", "b@x.com"),
            talent("Asha", "a@x.com"),
            talent("Chet", "c@x.com"),
            talent("Bina", "B@x.com"),
        ];
        let outcome = service.add_talents(tenant_id, actor, &inputs).await.unwrap();

        assert_eq!(outcome.added_count, 2);
        let indexes: Vec<_> = outcome.errors.iter().map(|e| e.index).collect();
        assert_eq!(indexes, vec![1, 3]);
    }

    #[tokio::test]
    async fn test_list_sums_lifetime_value_over_filter() {
        let (db, tenant_id) = setup().await;
        let service = TalentService::new(db);
        let actor = Uuid::new_v4();
        for n in 0..3 {
            let input = talent("Asha", &format!("a{}@x.com", n));
            service.add_talent(tenant_id, actor, &input).await.unwrap();
        }

        let list = service
            .get_talent_list(tenant_id, &TalentFilter::default(), Page::new(2, 0))
            .await
            .unwrap();

        assert_eq!(list.page.items.len(), 2);
        assert_eq!(list.page.total, 3);
        assert_eq!(list.total_lifetime_value, 4500.0);
    }

    #[tokio::test]
    async fn test_delete_twice_is_not_found() {
        let (db, tenant_id) = setup().await;
        let service = TalentService::new(db);
        let actor = Uuid::new_v4();
        let id = service.add_talent(tenant_id, actor, &talent("Asha", "a@x.com")).await.unwrap();

        service.delete_talent(tenant_id, id, actor).await.unwrap();
        let err = service.delete_talent(tenant_id, id, actor).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound { .. }));
        assert!(service.get_talent(tenant_id, id).await.is_err());
    }
}
