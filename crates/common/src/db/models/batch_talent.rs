//! Membership of a talent in a batch

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "batch_talents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    pub batch_id: Uuid,

    pub talent_id: Uuid,

    pub date_of_joining: Date,

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
        belongs_to = "super::batch::Entity",
        from = "Column::BatchId",
        to = "super::batch::Column::Id"
    )]
    Batch,

    #[sea_orm(
        belongs_to = "super::talent::Entity",
        from = "Column::TalentId",
        to = "super::talent::Column::Id"
    )]
    Talent,
}

impl Related<super::batch::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Batch.def()
    }
}

impl Related<super::talent::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Talent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
