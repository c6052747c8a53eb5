//! Batch entity: a cohort of talents going through a course together

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

string_enum! {
    BatchStatus {
        Upcoming => "upcoming",
        Ongoing => "ongoing",
        Finished => "finished",
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "batches")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub course_name: String,

    pub start_date: Date,

    pub end_date: Option<Date>,

    /// Maximum number of active talents
    pub total_intake: i32,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub is_active: bool,

    pub created_by: Uuid,

    pub created_at: DateTimeWithTimeZone,

    pub updated_by: Option<Uuid>,

    pub updated_at: Option<DateTimeWithTimeZone>,

    #[serde(skip)]
    pub deleted_by: Option<Uuid>,

    #[serde(skip)]
    pub deleted_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::tenant::Entity",
        from = "Column::TenantId",
        to = "super::tenant::Column::Id"
    )]
    Tenant,

    #[sea_orm(has_many = "super::batch_timing::Entity")]
    Timings,

    #[sea_orm(has_many = "super::batch_talent::Entity")]
    BatchTalents,

    #[sea_orm(has_many = "super::batch_session::Entity")]
    Sessions,

    #[sea_orm(has_many = "super::assignment::Entity")]
    Assignments,
}

impl Related<super::tenant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Tenant.def()
    }
}

impl Related<super::batch_timing::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Timings.def()
    }
}

impl Related<super::batch_talent::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BatchTalents.def()
    }
}

impl Related<super::batch_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Assignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
