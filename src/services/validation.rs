//! Field-level validation rules.
//!
//! Numeric client and case fields carry inclusive ranges mirrored by the
//! store's CHECK constraints. Account fields follow the registration rules.

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::{CaseUpdate, ClientFields, ClientSearchCriteria, CreateUserRequest, FieldValue};

use super::{ServiceError, ValidationErrors};

lazy_static! {
    /// Loose address shape: one `@`, a dot in the domain, no whitespace
    static ref EMAIL_REGEX: Regex = Regex::new(
        r"^[^@\s]+@[^@\s]+\.[^@\s]+$"
    ).unwrap();
}

/// Largest page a client listing may request
pub const MAX_PAGE_SIZE: i64 = 150;

/// Inclusive bounds of a numeric column; `None` means unbounded above.
#[derive(Debug, Clone, Copy)]
pub struct FieldRange {
    pub column: &'static str,
    pub min: i64,
    pub max: Option<i64>,
}

const fn range(column: &'static str, min: i64, max: i64) -> FieldRange {
    FieldRange {
        column,
        min,
        max: Some(max),
    }
}

const fn at_least(column: &'static str, min: i64) -> FieldRange {
    FieldRange {
        column,
        min,
        max: None,
    }
}

pub const CLIENT_RANGES: &[FieldRange] = &[
    at_least("age", 18),
    range("gender", 1, 2),
    at_least("work_experience", 0),
    at_least("canada_workex", 0),
    at_least("dep_num", 0),
    range("level_of_schooling", 1, 14),
    range("reading_english_scale", 0, 10),
    range("speaking_english_scale", 0, 10),
    range("writing_english_scale", 0, 10),
    range("numeracy_scale", 0, 10),
    range("computer_scale", 0, 10),
    range("housing", 1, 10),
    range("income_source", 1, 11),
    at_least("time_unemployed", 0),
];

pub const SUCCESS_RATE: FieldRange = range("success_rate", 0, 100);

impl FieldRange {
    pub fn check(&self, value: i64) -> Result<(), String> {
        match self.max {
            Some(max) if value < self.min || value > max => {
                Err(format!("must be between {} and {}", self.min, max))
            }
            None if value < self.min => Err(format!("must be at least {}", self.min)),
            _ => Ok(()),
        }
    }
}

fn client_range(column: &str) -> Option<&'static FieldRange> {
    CLIENT_RANGES.iter().find(|r| r.column == column)
}

fn check_ints(errors: &mut ValidationErrors, values: &[(&'static str, FieldValue)]) {
    for (column, value) in values {
        if let (Some(rule), Some(v)) = (client_range(column), value.as_int()) {
            errors.check(column, rule.check(v));
        }
    }
}

/// Validate the supplied fields of a client create or update
pub fn validate_client_fields(fields: &ClientFields) -> Result<(), ServiceError> {
    let mut errors = ValidationErrors::new();
    check_ints(&mut errors, &fields.assignments());
    errors.finish()
}

/// Validate search thresholds with the same ranges as the stored fields
pub fn validate_search_criteria(criteria: &ClientSearchCriteria) -> Result<(), ServiceError> {
    let mut errors = ValidationErrors::new();
    for (column, value) in criteria.numeric_values() {
        if let Some(rule) = client_range(column) {
            // Search parameters keep their query-string names
            let field = if column == "age" { "age_min" } else { column };
            errors.check(field, rule.check(value));
        }
    }
    errors.finish()
}

pub fn validate_case_update(update: &CaseUpdate) -> Result<(), ServiceError> {
    let mut errors = ValidationErrors::new();
    if let Some(rate) = update.success_rate {
        errors.check("success_rate", SUCCESS_RATE.check(rate));
    }
    errors.finish()
}

pub fn validate_min_rate(min_rate: i64) -> Result<(), ServiceError> {
    let mut errors = ValidationErrors::new();
    errors.check("min_rate", SUCCESS_RATE.check(min_rate));
    errors.finish()
}

pub fn validate_pagination(skip: i64, limit: i64) -> Result<(), ServiceError> {
    let mut errors = ValidationErrors::new();
    if skip < 0 {
        errors.add("skip", "must be at least 0");
    }
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        errors.add("limit", format!("must be between 1 and {}", MAX_PAGE_SIZE));
    }
    errors.finish()
}

/// Validate a username (3-50 characters)
pub fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if len < 3 {
        return Err("Username is too short (min 3 characters)".to_string());
    }
    if len > 50 {
        return Err("Username is too long (max 50 characters)".to_string());
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 100 {
        return Err("Email is too long (max 100 characters)".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    if password.len() > 128 {
        return Err("Password is too long (max 128 characters)".to_string());
    }
    Ok(())
}

pub fn validate_create_user(req: &CreateUserRequest) -> Result<(), ServiceError> {
    let mut errors = ValidationErrors::new();
    errors.check("username", validate_username(&req.username));
    errors.check("email", validate_email(&req.email));
    errors.check("password", validate_password(&req.password));
    errors.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_client_range_rejects_just_outside() {
        for rule in CLIENT_RANGES {
            assert!(rule.check(rule.min).is_ok(), "{} min", rule.column);
            assert!(rule.check(rule.min - 1).is_err(), "{} below", rule.column);
            if let Some(max) = rule.max {
                assert!(rule.check(max).is_ok(), "{} max", rule.column);
                assert!(rule.check(max + 1).is_err(), "{} above", rule.column);
            }
        }
    }

    #[test]
    fn test_client_fields_cite_offending_fields() {
        let fields = ClientFields {
            age: Some(17),
            gender: Some(3),
            housing: Some(5),
            ..Default::default()
        };
        let err = validate_client_fields(&fields).unwrap_err();
        assert_eq!(err.invalid_fields(), vec!["age", "gender"]);

        let ok = ClientFields {
            age: Some(25),
            ..Default::default()
        };
        assert!(validate_client_fields(&ok).is_ok());
    }

    #[test]
    fn test_search_criteria_use_query_names() {
        let criteria = ClientSearchCriteria {
            age_min: Some(10),
            numeracy_scale: Some(11),
            ..Default::default()
        };
        let err = validate_search_criteria(&criteria).unwrap_err();
        assert_eq!(err.invalid_fields(), vec!["age_min", "numeracy_scale"]);
    }

    #[test]
    fn test_success_rate_bounds() {
        assert!(validate_min_rate(0).is_ok());
        assert!(validate_min_rate(100).is_ok());
        assert!(validate_min_rate(101).is_err());
        assert!(validate_case_update(&CaseUpdate {
            success_rate: Some(-1),
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_pagination_bounds() {
        assert!(validate_pagination(0, 1).is_ok());
        assert!(validate_pagination(10, 150).is_ok());
        assert!(validate_pagination(-1, 50).is_err());
        assert!(validate_pagination(0, 0).is_err());
        assert!(validate_pagination(0, 151).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("case.worker-2").is_ok());
        assert!(validate_username("al").is_err());
        assert!(validate_username(&"a".repeat(51)).is_err());
        assert!(validate_username("Jane Doe").is_ok());
        assert!(validate_username("josé").is_ok());
        assert!(validate_username(&"é".repeat(50)).is_ok());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("alice@example.org").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("two@@example.org").is_err());
    }
}
