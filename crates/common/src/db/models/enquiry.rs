//! Enquiry entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

string_enum! {
    /// Channel an enquiry arrived through
    EnquirySource {
        Website => "website",
        Referral => "referral",
        WalkIn => "walk_in",
        SocialMedia => "social_media",
        Campaign => "campaign",
        Other => "other",
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "enquiries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub tenant_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub first_name: String,

    #[sea_orm(column_type = "Text")]
    pub last_name: String,

    #[sea_orm(column_type = "Text")]
    pub email: String,

    #[sea_orm(column_type = "Text")]
    pub contact: String,

    #[sea_orm(column_type = "Text")]
    pub source: String,

    pub enquiry_date: Date,

    #[sea_orm(column_type = "Text", nullable)]
    pub course_interest: Option<String>,

    #[sea_orm(column_type = "Text")]
    pub academic_year: String,

    pub is_converted: bool,

    /// Talent created when the enquiry was converted
    pub talent_id: Option<Uuid>,

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
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
