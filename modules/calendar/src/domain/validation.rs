//! Identifier parsing and input validators.
//!
//! Pure functions: each returns the normalized value or a
//! `DomainError::Validation` naming the offending field.

use std::str::FromStr;

use uuid::Uuid;

use crate::contract::model::{RecurrenceFrequency, Role, Timezone};
use crate::domain::error::DomainError;

pub const MAX_EMAIL_LEN: usize = 256;
pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 25;

/// Parse a caller-supplied identifier.
pub fn parse_id(field: &str, raw: &str) -> Result<Uuid, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "cannot be empty"));
    }
    Uuid::parse_str(trimmed)
        .map_err(|_| DomainError::validation(field, format!("'{trimmed}' is not a valid identifier")))
}

/// Trimmed text whose length (in characters) lies within `min..=max`.
pub fn bounded_text(field: &str, value: &str, min: usize, max: usize) -> Result<String, DomainError> {
    let trimmed = value.trim();
    let len = trimmed.chars().count();
    if len < min || len > max {
        return Err(DomainError::validation(
            field,
            format!("must be between {min} and {max} characters (got {len})"),
        ));
    }
    Ok(trimmed.to_string())
}

/// Person names: bounded and free of digits.
pub fn person_name(field: &str, value: &str) -> Result<String, DomainError> {
    let name = bounded_text(field, value, NAME_MIN_LEN, NAME_MAX_LEN)?;
    if name.chars().any(|c| c.is_ascii_digit()) {
        return Err(DomainError::validation(field, "should not contain numbers"));
    }
    Ok(name)
}

/// Trimmed, lower-cased email with a minimal shape check.
pub fn normalize_email(raw: &str) -> Result<String, DomainError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return Err(DomainError::validation(
            "email",
            format!("must be between 1 and {MAX_EMAIL_LEN} characters"),
        ));
    }
    if email.chars().any(char::is_whitespace) {
        return Err(DomainError::validation("email", "must not contain whitespace"));
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err(DomainError::validation("email", format!("'{email}' is not a valid email")));
    };
    let domain_ok = !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.');
    if local.is_empty() || !domain_ok {
        return Err(DomainError::validation("email", format!("'{email}' is not a valid email")));
    }
    Ok(email)
}

fn parse_enum<T: FromStr>(field: &str, raw: &str, allowed: &str) -> Result<T, DomainError> {
    raw.parse::<T>()
        .map_err(|_| DomainError::validation(field, format!("must be one of {allowed}")))
}

pub fn parse_timezone(raw: &str) -> Result<Timezone, DomainError> {
    parse_enum("timezone", raw, "EST, PST, CST")
}

pub fn parse_role(raw: &str) -> Result<Role, DomainError> {
    parse_enum("role", raw, "admin, user")
}

/// Resolve the stored frequency: "N/A" for one-off events, weekly/monthly otherwise.
pub fn recurrence_frequency(
    is_recurring: bool,
    raw: Option<&str>,
) -> Result<RecurrenceFrequency, DomainError> {
    if !is_recurring {
        return Ok(RecurrenceFrequency::NotApplicable);
    }
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).ok_or_else(|| {
        DomainError::validation("recurrence_frequency", "required for recurring events")
    })?;
    match parse_enum("recurrence_frequency", raw, "weekly, monthly")? {
        RecurrenceFrequency::NotApplicable => Err(DomainError::validation(
            "recurrence_frequency",
            "must be one of weekly, monthly",
        )),
        freq => Ok(freq),
    }
}

/// Positive occurrence count no larger than `max`.
pub fn occurrence_count(raw: Option<i64>, max: u32) -> Result<u32, DomainError> {
    let n = raw.ok_or_else(|| {
        DomainError::validation("number_of_occurrences", "required for recurring events")
    })?;
    if n <= 0 {
        return Err(DomainError::validation(
            "number_of_occurrences",
            "must be a positive integer",
        ));
    }
    u32::try_from(n)
        .ok()
        .filter(|n| *n <= max)
        .ok_or_else(|| DomainError::validation("number_of_occurrences", format!("must not exceed {max}")))
}

/// Reminder lead time in minutes.
pub fn reminder_minutes(value: i64, max: i64) -> Result<i64, DomainError> {
    if value < 0 {
        return Err(DomainError::validation("reminder", "must be a non-negative number"));
    }
    if value > max {
        return Err(DomainError::validation("reminder", format!("must not exceed {max} minutes")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_id_trims_and_rejects_garbage() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id("id", &format!("  {id} ")).unwrap(), id);

        let err = parse_id("id", "   ").unwrap_err();
        assert_eq!(err.field(), Some("id"));

        let err = parse_id("event_id", "not-an-id").unwrap_err();
        assert_eq!(err.field(), Some("event_id"));
    }

    #[test]
    fn bounded_text_counts_trimmed_chars() {
        assert_eq!(bounded_text("title", "  Standup  ", 1, 30).unwrap(), "Standup");
        assert!(bounded_text("title", "   ", 1, 30).is_err());
        assert!(bounded_text("title", &"x".repeat(31), 1, 30).is_err());
        // multi-byte characters count once
        assert!(bounded_text("title", &"é".repeat(30), 1, 30).is_ok());
    }

    #[test]
    fn person_name_rejects_digits() {
        assert_eq!(person_name("first_name", "Ada").unwrap(), "Ada");
        let err = person_name("first_name", "Ada2").unwrap_err();
        assert_eq!(err.field(), Some("first_name"));
        assert!(person_name("last_name", "L").is_err());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Ada@Example.COM ").unwrap(), "ada@example.com");
        for bad in ["", "ada", "@example.com", "ada@example", "ada@.com", "a da@example.com", "a@b@c.com"] {
            assert!(normalize_email(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn enums_parse_case_insensitively() {
        assert_eq!(parse_timezone("pst").unwrap(), Timezone::Pst);
        assert_eq!(parse_role("ADMIN").unwrap(), Role::Admin);
        assert_eq!(parse_timezone("UTC").unwrap_err().field(), Some("timezone"));
        assert_eq!(parse_role("root").unwrap_err().field(), Some("role"));
    }

    #[test]
    fn frequency_is_na_for_one_off_events() {
        assert_eq!(
            recurrence_frequency(false, Some("weekly")).unwrap(),
            RecurrenceFrequency::NotApplicable
        );
        assert_eq!(
            recurrence_frequency(true, Some(" Monthly ")).unwrap(),
            RecurrenceFrequency::Monthly
        );
        assert!(recurrence_frequency(true, None).is_err());
        assert!(recurrence_frequency(true, Some("N/A")).is_err());
        assert!(recurrence_frequency(true, Some("daily")).is_err());
    }

    #[test]
    fn occurrence_count_bounds() {
        assert_eq!(occurrence_count(Some(3), 10).unwrap(), 3);
        assert!(occurrence_count(None, 10).is_err());
        assert!(occurrence_count(Some(0), 10).is_err());
        assert!(occurrence_count(Some(-4), 10).is_err());
        assert!(occurrence_count(Some(11), 10).is_err());
        assert!(occurrence_count(Some(i64::MAX), 10).is_err());
    }

    #[test]
    fn reminder_bounds() {
        assert_eq!(reminder_minutes(0, 60).unwrap(), 0);
        assert!(reminder_minutes(-1, 60).is_err());
        assert!(reminder_minutes(61, 60).is_err());
    }
}
