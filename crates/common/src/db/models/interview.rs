//! Interview of a talent

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

string_enum! {
    InterviewStatus {
        Scheduled => "scheduled",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "interviews")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub talent_id: Uuid,

    pub scheduled_date: Date,

    #[sea_orm(column_type = "Text", nullable)]
    pub interviewer: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub status: String,

    pub rating: Option<i32>,

    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,

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
        belongs_to = "super::talent::Entity",
        from = "Column::TalentId",
        to = "super::talent::Column::Id"
    )]
    Talent,
}

impl Related<super::talent::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Talent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
