//! Session plan allocation
//!
//! Lays the ordered teaching units of a batch onto calendar days. Only
//! weekdays present in the weekly schedule are session days, and each
//! session day holds as many minutes as its slot is long. Units are placed
//! in order; a unit that does not fit in what is left of a day takes the
//! rest of it and continues on the next session day.
//!
//! The allocator is pure: loading units and persisting the plan is the
//! session service's job.

use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::errors::AppError;

/// A topic (or sub-topic) to be taught, in teaching order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unit {
    pub module_id: Uuid,
    pub topic_id: Uuid,
    pub sub_topic_id: Option<Uuid>,
    pub minutes: u32,
}

/// Portion of a unit taught on a session day
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedTopic {
    pub unit: Unit,
    pub minutes: u32,
    /// 1-based position within the session
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedSession {
    pub date: NaiveDate,
    /// 1-based position within the plan
    pub order: u32,
    pub topics: Vec<PlannedTopic>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("batch has no weekly schedule")]
    NoSchedule,

    #[error("batch has no topics to plan")]
    NoUnits,

    #[error("batch end date {end} reached with {remaining_minutes} minutes left to plan")]
    EndDateReached { end: NaiveDate, remaining_minutes: u64 },

    #[error("calendar overflow after {0}")]
    CalendarOverflow(NaiveDate),
}

impl From<PlanError> for AppError {
    fn from(err: PlanError) -> Self {
        AppError::conflict(err.to_string())
    }
}

/// Allocate `units` to session days starting at `start`
///
/// `schedule` lists the weekly slots as (weekday, minutes). Slots sharing a
/// weekday add up. `end`, when set, is the last date a session may fall on.
pub fn allocate(
    start: NaiveDate,
    end: Option<NaiveDate>,
    schedule: &[(Weekday, u32)],
    units: &[Unit],
) -> Result<Vec<PlannedSession>, PlanError> {
    let mut capacity: HashMap<Weekday, u32> = HashMap::new();
    for &(day, minutes) in schedule {
        if minutes > 0 {
            *capacity.entry(day).or_default() += minutes;
        }
    }
    if capacity.is_empty() {
        return Err(PlanError::NoSchedule);
    }

    let units: Vec<Unit> = units.iter().copied().filter(|u| u.minutes > 0).collect();
    if units.is_empty() {
        return Err(PlanError::NoUnits);
    }

    let mut sessions = Vec::new();
    let mut index = 0;
    let mut remaining = units[0].minutes;
    let mut date = start;

    while index < units.len() {
        if let Some(end) = end {
            if date > end {
                let left: u64 = u64::from(remaining)
                    + units[index + 1..].iter().map(|u| u64::from(u.minutes)).sum::<u64>();
                return Err(PlanError::EndDateReached {
                    end,
                    remaining_minutes: left,
                });
            }
        }

        if let Some(&day_capacity) = capacity.get(&date.weekday()) {
            let mut free = day_capacity;
            let mut topics = Vec::new();

            while free > 0 && index < units.len() {
                let taken = remaining.min(free);
                topics.push(PlannedTopic {
                    unit: units[index],
                    minutes: taken,
                    order: topics.len() as u32 + 1,
                });
                free -= taken;
                remaining -= taken;

                if remaining == 0 {
                    index += 1;
                    if let Some(next) = units.get(index) {
                        remaining = next.minutes;
                    }
                }
            }

            sessions.push(PlannedSession {
                date,
                order: sessions.len() as u32 + 1,
                topics,
            });
        }

        date = date.succ_opt().ok_or(PlanError::CalendarOverflow(date))?;
    }

    Ok(sessions)
}
