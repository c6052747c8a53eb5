//! SeaORM entity models
//!
//! Every entity except [`Tenant`] carries the same envelope: `id`,
//! `tenant_id`, `created_by`, `created_at`, `updated_by`, `updated_at`,
//! `deleted_by` and `deleted_at`. The envelope columns are wired to the
//! generic repository helpers through [`TenantScoped`].

/// Closed set of values stored in a text column
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ();

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    _ => Err(()),
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
            where
                S: ::serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
            where
                D: ::serde::Deserializer<'de>,
            {
                let value = String::deserialize(deserializer)?;
                value.parse().map_err(|_| {
                    <D::Error as ::serde::de::Error>::custom(format!("unknown value: {}", value))
                })
            }
        }
    };
}

pub mod assignment;
pub mod batch;
pub mod batch_module;
pub mod batch_session;
pub mod batch_talent;
pub mod batch_timing;
pub mod course_module;
pub mod discussion;
pub mod enquiry;
pub mod feedback;
pub mod interview;
pub mod module_topic;
pub mod notification;
pub mod reply;
pub mod session_topic;
pub mod talent;
pub mod tenant;
pub mod waiting_list;

use crate::db::repository::TenantScoped;

pub use tenant::{
    Entity as TenantEntity,
    Model as Tenant,
    ActiveModel as TenantActiveModel,
    Column as TenantColumn,
};

pub use talent::{
    AcademicYear,
    Entity as TalentEntity,
    Model as Talent,
    ActiveModel as TalentActiveModel,
    Column as TalentColumn,
};

pub use enquiry::{
    EnquirySource,
    Entity as EnquiryEntity,
    Model as Enquiry,
    ActiveModel as EnquiryActiveModel,
    Column as EnquiryColumn,
};

pub use batch::{
    BatchStatus,
    Entity as BatchEntity,
    Model as Batch,
    ActiveModel as BatchActiveModel,
    Column as BatchColumn,
};

pub use batch_timing::{
    Entity as BatchTimingEntity,
    Model as BatchTiming,
    ActiveModel as BatchTimingActiveModel,
    Column as BatchTimingColumn,
};

pub use batch_talent::{
    Entity as BatchTalentEntity,
    Model as BatchTalent,
    ActiveModel as BatchTalentActiveModel,
    Column as BatchTalentColumn,
};

pub use course_module::{
    Entity as CourseModuleEntity,
    Model as CourseModule,
    ActiveModel as CourseModuleActiveModel,
    Column as CourseModuleColumn,
};

pub use module_topic::{
    Entity as ModuleTopicEntity,
    Model as ModuleTopic,
    ActiveModel as ModuleTopicActiveModel,
    Column as ModuleTopicColumn,
};

pub use batch_module::{
    Entity as BatchModuleEntity,
    Model as BatchModule,
    ActiveModel as BatchModuleActiveModel,
    Column as BatchModuleColumn,
};

pub use batch_session::{
    Entity as BatchSessionEntity,
    Model as BatchSession,
    ActiveModel as BatchSessionActiveModel,
    Column as BatchSessionColumn,
};

pub use session_topic::{
    Entity as SessionTopicEntity,
    Model as SessionTopic,
    ActiveModel as SessionTopicActiveModel,
    Column as SessionTopicColumn,
};

pub use feedback::{
    Entity as FeedbackEntity,
    Model as Feedback,
    ActiveModel as FeedbackActiveModel,
    Column as FeedbackColumn,
};

pub use notification::{
    NotificationType,
    Entity as NotificationEntity,
    Model as Notification,
    ActiveModel as NotificationActiveModel,
    Column as NotificationColumn,
};

pub use discussion::{
    Entity as DiscussionEntity,
    Model as Discussion,
    ActiveModel as DiscussionActiveModel,
    Column as DiscussionColumn,
};

pub use reply::{
    Entity as ReplyEntity,
    Model as Reply,
    ActiveModel as ReplyActiveModel,
    Column as ReplyColumn,
};

pub use interview::{
    InterviewStatus,
    Entity as InterviewEntity,
    Model as Interview,
    ActiveModel as InterviewActiveModel,
    Column as InterviewColumn,
};

pub use waiting_list::{
    Entity as WaitingListEntity,
    Model as WaitingList,
    ActiveModel as WaitingListActiveModel,
    Column as WaitingListColumn,
};

pub use assignment::{
    Entity as AssignmentEntity,
    Model as Assignment,
    ActiveModel as AssignmentActiveModel,
    Column as AssignmentColumn,
};

/// Implement [`TenantScoped`] for entities that carry the standard envelope
macro_rules! tenant_scoped {
    ($($module:ident => $resource:literal),* $(,)?) => {
        $(
            impl TenantScoped for $module::Entity {
                const RESOURCE: &'static str = $resource;

                fn id_column() -> Self::Column {
                    $module::Column::Id
                }

                fn tenant_column() -> Self::Column {
                    $module::Column::TenantId
                }

                fn created_at_column() -> Self::Column {
                    $module::Column::CreatedAt
                }

                fn deleted_by_column() -> Self::Column {
                    $module::Column::DeletedBy
                }

                fn deleted_at_column() -> Self::Column {
                    $module::Column::DeletedAt
                }
            }
        )*
    };
}

tenant_scoped! {
    talent => "talent",
    enquiry => "enquiry",
    batch => "batch",
    batch_timing => "batch timing",
    batch_talent => "batch talent",
    course_module => "module",
    module_topic => "topic",
    batch_module => "batch module",
    batch_session => "session",
    session_topic => "session topic",
    feedback => "feedback",
    notification => "notification",
    discussion => "discussion",
    reply => "reply",
    interview => "interview",
    waiting_list => "waiting list",
    assignment => "assignment",
}
