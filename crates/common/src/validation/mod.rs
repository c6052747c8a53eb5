//! Field rules shared by the per-entity validators
//!
//! Every rule returns the first violation it sees as
//! [`AppError::Validation`]. Entity validators chain rules with `?` in a
//! fixed order, so a payload that breaks several rules always reports the
//! same one.

use crate::errors::{AppError, Result};
use chrono::{NaiveDate, NaiveTime, Weekday};
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;
use validator::{ValidateEmail, ValidateLength};

/// Per-entity rule set, run after decoding and before any service call
pub trait Check {
    fn check(&self) -> Result<()>;
}

/// Validate every element of a bulk payload, stopping at the first failure
pub fn check_all<T: Check>(items: &[T]) -> Result<()> {
    if items.is_empty() {
        return Err(AppError::validation("items", "at least one record must be specified"));
    }

    for (index, item) in items.iter().enumerate() {
        if let Err(err) = item.check() {
            return Err(match err {
                AppError::Validation { message, field } => AppError::Validation {
                    message: format!("record {}: {}", index + 1, message),
                    field,
                },
                other => other,
            });
        }
    }

    Ok(())
}

/// Text must be present and not blank
pub fn required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::validation(field, format!("{} must be specified", field)));
    }
    Ok(())
}

/// Text length must fall inside `min..=max` characters
pub fn length(field: &str, value: &str, min: u64, max: u64) -> Result<()> {
    if !value.validate_length(Some(min), Some(max), None) {
        return Err(AppError::validation(
            field,
            format!("{} must be between {} and {} characters", field, min, max),
        ));
    }
    Ok(())
}

/// Required text with an upper bound
pub fn required_max(field: &str, value: &str, max: u64) -> Result<()> {
    required(field, value)?;
    length(field, value, 1, max)
}

/// Optional text with an upper bound
pub fn optional_max(field: &str, value: Option<&str>, max: u64) -> Result<()> {
    match value {
        Some(value) => length(field, value, 0, max),
        None => Ok(()),
    }
}

pub fn email(field: &str, value: &str) -> Result<()> {
    required(field, value)?;
    if !value.validate_email() {
        return Err(AppError::validation(field, format!("{} must be a valid email address", field)));
    }
    Ok(())
}

/// Ten digit phone number
pub fn contact(field: &str, value: &str) -> Result<()> {
    required(field, value)?;
    if value.len() != 10 || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::validation(field, format!("{} must be a 10 digit number", field)));
    }
    Ok(())
}

/// Numeric value must fall inside `min..=max`
pub fn range<T>(field: &str, value: T, min: T, max: T) -> Result<()>
where
    T: PartialOrd + Display,
{
    if value < min || value > max {
        return Err(AppError::validation(
            field,
            format!("{} must be between {} and {}", field, min, max),
        ));
    }
    Ok(())
}

/// Identifier must be set (not the nil UUID)
pub fn id(field: &str, value: Uuid) -> Result<()> {
    if value.is_nil() {
        return Err(AppError::validation(field, format!("{} must be specified", field)));
    }
    Ok(())
}

/// Value must name one of the variants of `E`
pub fn one_of<E>(field: &str, value: &str) -> Result<E>
where
    E: FromStr,
{
    required(field, value)?;
    value
        .parse::<E>()
        .map_err(|_| AppError::validation(field, format!("{} has an invalid value: {}", field, value)))
}

/// `earlier` must come strictly before `later`
pub fn ordered_dates(
    earlier_field: &str,
    earlier: NaiveDate,
    later_field: &str,
    later: NaiveDate,
) -> Result<()> {
    if earlier >= later {
        return Err(AppError::validation(
            later_field,
            format!("{} must be after {}", later_field, earlier_field),
        ));
    }
    Ok(())
}

/// Clock time in `HH:MM` form
pub fn time_of_day(field: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| AppError::validation(field, format!("{} must be a time in HH:MM form", field)))
}

/// Day name such as `monday` or `Tue`
pub fn weekday(field: &str, value: &str) -> Result<Weekday> {
    value
        .trim()
        .parse::<Weekday>()
        .map_err(|_| AppError::validation(field, format!("{} must be a day of the week", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    impl Check for Named {
        fn check(&self) -> Result<()> {
            required("name", self.0)
        }
    }

    fn field_of(err: AppError) -> Option<String> {
        match err {
            AppError::Validation { field, .. } => field,
            _ => None,
        }
    }

    #[test]
    fn test_required() {
        assert!(required("name", "Asha").is_ok());
        assert_eq!(field_of(required("name", "   ").unwrap_err()).as_deref(), Some("name"));
    }

    #[test]
    fn test_email_and_contact() {
        assert!(email("email", "a@x.com").is_ok());
        assert!(email("email", "not-an-email").is_err());
        assert!(contact("contact", "9876543210").is_ok());
        assert!(contact("contact", "98765").is_err());
        assert!(contact("contact", "98765abcde").is_err());
    }

    #[test]
    fn test_length_and_range() {
        assert!(length("name", "abc", 1, 3).is_ok());
        assert!(length("name", "abcd", 1, 3).is_err());
        assert!(range("score", 5, 1, 10).is_ok());
        assert!(range("score", 11, 1, 10).is_err());
    }

    #[test]
    fn test_dates_and_times() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(ordered_dates("startDate", start, "endDate", end).is_ok());
        assert!(ordered_dates("startDate", end, "endDate", start).is_err());
        assert_eq!(
            time_of_day("fromTime", "09:30").unwrap(),
            NaiveTime::from_hms_opt(9, 30, 0).unwrap()
        );
        assert!(time_of_day("fromTime", "25:00").is_err());
        assert_eq!(weekday("day", "Monday").unwrap(), Weekday::Mon);
        assert!(weekday("day", "someday").is_err());
    }

    #[test]
    fn test_check_all_reports_first_failing_record() {
        let items = [Named("a"), Named(""), Named("")];
        let err = check_all(&items).unwrap_err();
        assert_eq!(err.to_string(), "record 2: name must be specified");
    }

    #[test]
    fn test_check_all_rejects_empty_batch() {
        let items: [Named; 0] = [];
        assert!(check_all(&items).is_err());
    }
}
