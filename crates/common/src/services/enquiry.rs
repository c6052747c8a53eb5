//! Enquiry service, including conversion of an enquiry into a talent

use chrono::NaiveDate;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, PaginatorTrait, QueryFilter, Set};
use serde::Deserialize;
use std::collections::HashSet;
use tracing::info;
use uuid::Uuid;

use crate::db::models::{
    AcademicYear, Enquiry, EnquiryActiveModel, EnquiryColumn, EnquiryEntity, EnquirySource,
};
use crate::db::repository::{self, now, TenantScoped};
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use crate::metrics::{record_bulk_rejections, record_mutation};
use crate::pagination::{Page, Paged};
use crate::services::talent::{self, normalize_email, TalentInput};
use crate::services::{search_condition, BulkOutcome};
use crate::validation::{self, Check};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryInput {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub source: String,
    pub enquiry_date: Option<NaiveDate>,
    pub course_interest: Option<String>,
    #[serde(default)]
    pub academic_year: String,
}

impl Check for EnquiryInput {
    fn check(&self) -> Result<()> {
        validation::required_max("firstName", &self.first_name, 50)?;
        validation::required_max("lastName", &self.last_name, 50)?;
        validation::email("email", &self.email)?;
        validation::contact("contact", &self.contact)?;
        validation::one_of::<EnquirySource>("source", &self.source)?;
        if self.enquiry_date.is_none() {
            return Err(AppError::validation("enquiryDate", "enquiryDate must be specified"));
        }
        validation::optional_max("courseInterest", self.course_interest.as_deref(), 100)?;
        validation::one_of::<AcademicYear>("academicYear", &self.academic_year)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryFilter {
    pub search: Option<String>,
    pub source: Option<EnquirySource>,
    pub is_converted: Option<bool>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct EnquiryService {
    db: DbPool,
}

impl EnquiryService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn add_enquiry(
        &self,
        tenant_id: Uuid,
        actor: Uuid,
        input: &EnquiryInput,
    ) -> Result<Uuid> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;

        let email = normalize_email(&input.email);
        if email_taken(conn, tenant_id, &email).await? {
            return Err(AppError::Duplicate {
                message: format!("enquiry with email {} already exists", email),
            });
        }

        let enquiry = insert(conn, tenant_id, actor, input).await?;
        record_mutation("enquiry", "add");

        info!(tenant_id = %tenant_id, enquiry_id = %enquiry.id, "Enquiry added");
        Ok(enquiry.id)
    }

    /// Add enquiries one by one, reporting email clashes per record
    pub async fn add_enquiries(
        &self,
        tenant_id: Uuid,
        actor: Uuid,
        inputs: &[EnquiryInput],
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
            if email_taken(conn, tenant_id, &email).await? {
                outcome.reject(index, &email, "email already registered");
                continue;
            }

            match insert(conn, tenant_id, actor, input).await {
                Ok(_) => outcome.added_count += 1,
                Err(AppError::Duplicate { message }) => outcome.reject(index, &email, message),
                Err(err) => return Err(err),
            }
        }

        record_bulk_rejections("enquiry", outcome.errors.len());
        info!(
            tenant_id = %tenant_id,
            added = outcome.added_count,
            rejected = outcome.errors.len(),
            "Enquiries added in bulk"
        );
        Ok(outcome)
    }

    pub async fn update_enquiry(
        &self,
        tenant_id: Uuid,
        enquiry_id: Uuid,
        actor: Uuid,
        input: &EnquiryInput,
    ) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;

        let existing = repository::find::<EnquiryEntity, _>(conn, tenant_id, enquiry_id).await?;

        let email = normalize_email(&input.email);
        if email != existing.email && email_taken(conn, tenant_id, &email).await? {
            return Err(AppError::Duplicate {
                message: format!("enquiry with email {} already exists", email),
            });
        }

        let mut enquiry: EnquiryActiveModel = existing.into();
        enquiry.first_name = Set(input.first_name.trim().to_string());
        enquiry.last_name = Set(input.last_name.trim().to_string());
        enquiry.email = Set(email);
        enquiry.contact = Set(input.contact.clone());
        enquiry.source = Set(input.source.clone());
        if let Some(date) = input.enquiry_date {
            enquiry.enquiry_date = Set(date);
        }
        enquiry.course_interest = Set(input.course_interest.clone());
        enquiry.academic_year = Set(input.academic_year.clone());
        enquiry.updated_by = Set(Some(actor));
        enquiry.updated_at = Set(Some(now()));
        enquiry.update(conn).await?;

        record_mutation("enquiry", "update");
        info!(tenant_id = %tenant_id, enquiry_id = %enquiry_id, "Enquiry updated");
        Ok(())
    }

    pub async fn delete_enquiry(&self, tenant_id: Uuid, enquiry_id: Uuid, actor: Uuid) -> Result<()> {
        let conn = self.db.write();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::soft_delete::<EnquiryEntity, _>(conn, tenant_id, enquiry_id, actor).await?;

        record_mutation("enquiry", "delete");
        info!(tenant_id = %tenant_id, enquiry_id = %enquiry_id, "Enquiry deleted");
        Ok(())
    }

    pub async fn get_enquiry(&self, tenant_id: Uuid, enquiry_id: Uuid) -> Result<Enquiry> {
        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;
        repository::find::<EnquiryEntity, _>(conn, tenant_id, enquiry_id).await
    }

    pub async fn get_enquiry_list(
        &self,
        tenant_id: Uuid,
        filter: &EnquiryFilter,
        page: Page,
    ) -> Result<Paged<Enquiry>> {
        if let (Some(from), Some(to)) = (filter.date_from, filter.date_to) {
            if from > to {
                return Err(AppError::validation("dateTo", "dateTo must not be before dateFrom"));
            }
        }

        let conn = self.db.read();
        repository::ensure_tenant(conn, tenant_id).await?;

        let mut query = EnquiryEntity::scoped(tenant_id);
        if let Some(ref term) = filter.search {
            query = query.filter(search_condition(
                &[EnquiryColumn::FirstName, EnquiryColumn::LastName, EnquiryColumn::Email],
                term,
            ));
        }
        if let Some(source) = filter.source {
            query = query.filter(EnquiryColumn::Source.eq(source.as_str()));
        }
        if let Some(converted) = filter.is_converted {
            query = query.filter(EnquiryColumn::IsConverted.eq(converted));
        }
        if let Some(from) = filter.date_from {
            query = query.filter(EnquiryColumn::EnquiryDate.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(EnquiryColumn::EnquiryDate.lte(to));
        }

        repository::fetch_page(conn, query, page).await
    }

    /// Create a talent from the enquiry and mark the enquiry converted
    ///
    /// Both writes commit together or not at all.
    pub async fn convert_enquiry(
        &self,
        tenant_id: Uuid,
        enquiry_id: Uuid,
        actor: Uuid,
    ) -> Result<Uuid> {
        let txn = self.db.begin().await?;
        repository::ensure_tenant(&txn, tenant_id).await?;

        let enquiry = repository::find::<EnquiryEntity, _>(&txn, tenant_id, enquiry_id).await?;
        if enquiry.is_converted {
            return Err(AppError::conflict(format!(
                "enquiry {} is already converted",
                enquiry_id
            )));
        }
        if talent::email_taken(&txn, tenant_id, &enquiry.email, None).await? {
            return Err(AppError::conflict(format!(
                "a talent with email {} already exists",
                enquiry.email
            )));
        }

        let input = TalentInput {
            first_name: enquiry.first_name.clone(),
            last_name: enquiry.last_name.clone(),
            email: enquiry.email.clone(),
            contact: enquiry.contact.clone(),
            academic_year: enquiry.academic_year.clone(),
            college: None,
            experience_years: None,
            lifetime_value: None,
            is_active: true,
        };
        let created = talent::insert(&txn, tenant_id, actor, &input).await?;

        let mut converted: EnquiryActiveModel = enquiry.into();
        converted.is_converted = Set(true);
        converted.talent_id = Set(Some(created.id));
        converted.updated_by = Set(Some(actor));
        converted.updated_at = Set(Some(now()));
        converted.update(&txn).await?;

        txn.commit().await?;

        record_mutation("enquiry", "convert");
        info!(
            tenant_id = %tenant_id,
            enquiry_id = %enquiry_id,
            talent_id = %created.id,
            "Enquiry converted to talent"
        );
        Ok(created.id)
    }
}

async fn insert<C>(conn: &C, tenant_id: Uuid, actor: Uuid, input: &EnquiryInput) -> Result<Enquiry>
where
    C: ConnectionTrait,
{
    let enquiry = EnquiryActiveModel {
        id: Set(Uuid::new_v4()),
        tenant_id: Set(tenant_id),
        first_name: Set(input.first_name.trim().to_string()),
        last_name: Set(input.last_name.trim().to_string()),
        email: Set(normalize_email(&input.email)),
        contact: Set(input.contact.clone()),
        source: Set(input.source.clone()),
        enquiry_date: Set(input.enquiry_date.unwrap_or_else(|| now().date_naive())),
        course_interest: Set(input.course_interest.clone()),
        academic_year: Set(input.academic_year.clone()),
        is_converted: Set(false),
        talent_id: Set(None),
        created_by: Set(actor),
        created_at: Set(now()),
        updated_by: Set(None),
        updated_at: Set(None),
        deleted_by: Set(None),
        deleted_at: Set(None),
    };

    enquiry.insert(conn).await.map_err(Into::into)
}

async fn email_taken<C>(conn: &C, tenant_id: Uuid, email: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    let count = EnquiryEntity::scoped(tenant_id)
        .filter(EnquiryColumn::Email.eq(email))
        .count(conn)
        .await?;
    Ok(count > 0)
}
