//! Planned session day of a batch

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "batch_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub batch_id: Uuid,

    pub session_date: Date,

    pub session_order: i32,

    pub is_completed: bool,

    pub completed_at: Option<DateTimeWithTimeZone>,

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
        belongs_to = "super::batch::Entity",
        from = "Column::BatchId",
        to = "super::batch::Column::Id"
    )]
    Batch,

    #[sea_orm(has_many = "super::session_topic::Entity")]
    Topics,

    #[sea_orm(has_many = "super::feedback::Entity")]
    Feedback,
}

impl Related<super::batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
    }
}

impl Related<super::session_topic::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Topics.def()
    }
}

impl Related<super::feedback::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Feedback.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
