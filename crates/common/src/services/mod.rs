//! Use-case layer: one service per resource
//!
//! Services take already validated input plus explicit scoping ids (the
//! tenant, the acting credential and any parent id from the path). Every
//! operation checks the tenant first and goes through the tenant-scoped
//! repository helpers. Operations that write more than one row run inside
//! a single transaction.

pub mod assignment;
pub mod batch;
pub mod course;
pub mod discussion;
pub mod enquiry;
pub mod feedback;
pub mod interview;
pub mod notification;
pub mod planner;
pub mod session;
pub mod talent;
pub mod waiting_list;

#[cfg(test)]
pub(crate) mod testing;

pub use assignment::AssignmentService;
pub use batch::BatchService;
pub use course::CourseService;
pub use discussion::DiscussionService;
pub use enquiry::EnquiryService;
pub use feedback::FeedbackService;
pub use interview::InterviewService;
pub use notification::NotificationService;
pub use session::SessionService;
pub use talent::TalentService;
pub use waiting_list::WaitingListService;

use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{ColumnTrait, Condition};
use serde::Serialize;

/// Outcome of a bulk add where records are persisted independently
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub added_count: usize,
    pub errors: Vec<BulkError>,
}

/// A record of a bulk add that was not persisted
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BulkError {
    /// 0-based position in the request
    pub index: usize,
    pub email: String,
    pub message: String,
}

impl BulkOutcome {
    pub fn reject(&mut self, index: usize, email: &str, message: impl Into<String>) {
        self.errors.push(BulkError {
            index,
            email: email.to_string(),
            message: message.into(),
        });
    }
}

/// Case-insensitive substring match of `term` on any of `columns`
pub(crate) fn search_condition<C>(columns: &[C], term: &str) -> Condition
where
    C: ColumnTrait,
{
    let pattern = like_pattern(&term.to_lowercase());
    columns.iter().fold(Condition::any(), |condition, column| {
        condition.add(
            Expr::expr(Func::lower(Expr::col(*column)))
                .like(LikeExpr::new(pattern.clone()).escape('\\')),
        )
    })
}

/// Escape a user search term for a `LIKE` pattern
pub(crate) fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" asha "), "%asha%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_bulk_outcome_serializes_camel_case() {
        let mut outcome = BulkOutcome {
            added_count: 1,
            ..Default::default()
        };
        outcome.reject(1, "a@x.com", "email already registered");

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["addedCount"], 1);
        assert_eq!(json["errors"][0]["index"], 1);
        assert_eq!(json["errors"][0]["email"], "a@x.com");
    }
}
