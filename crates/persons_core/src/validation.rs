//! Request validation rules.
//!
//! # Responsibility
//! - Check handler requests before any store access.
//! - Report every failing field at once as `FieldError` pairs.
//!
//! # Invariants
//! - Validation is pure: it never touches storage or the clock beyond
//!   reading today's date.

use crate::model::EntityId;
use chrono::{Months, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 50;
pub const PHONE_MIN_CHARS: usize = 4;
pub const PHONE_MAX_CHARS: usize = 50;
pub const ADULT_AGE_YEARS: u32 = 18;

// Either alphabet is accepted, but a single name never mixes both.
static NAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z]+|[\x{10D0}-\x{10F0}]+)$").expect("name pattern is valid")
});
static PERSONAL_NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{11}$").expect("personal number pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Implemented by every handler request.
pub trait Validate {
    /// Returns every rule violation; empty means valid.
    fn validate(&self) -> Vec<FieldError>;
}

/// Accumulates field errors across rules.
#[derive(Debug, Default)]
pub struct Rules {
    errors: Vec<FieldError>,
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, field: &str, ok: bool, message: impl Into<String>) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    /// Required, 2-50 characters, Latin-only or Georgian-only letters.
    pub fn person_name(&mut self, field: &str, label: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            return self.check(field, false, format!("{label} is required."));
        }
        let chars = value.chars().count();
        self.check(
            field,
            chars >= NAME_MIN_CHARS,
            format!("{label} must be at least {NAME_MIN_CHARS} characters long."),
        )
        .check(
            field,
            chars <= NAME_MAX_CHARS,
            format!("{label} must not exceed {NAME_MAX_CHARS} characters."),
        )
        .check(
            field,
            NAME_PATTERN.is_match(value),
            format!(
                "{label} must contain only letters of the Georgian or Latin alphabet and must not contain both."
            ),
        )
    }

    pub fn personal_number(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            return self.check(field, false, "Personal number is required.");
        }
        self.check(
            field,
            PERSONAL_NUMBER_PATTERN.is_match(value),
            "Personal number must be 11 digits.",
        )
    }

    pub fn adult(&mut self, field: &str, date_of_birth: NaiveDate) -> &mut Self {
        let today = Utc::now().date_naive();
        self.check(
            field,
            is_adult_on(date_of_birth, today),
            format!("Person must be at least {ADULT_AGE_YEARS} years old."),
        )
    }

    pub fn positive_id(&mut self, field: &str, label: &str, id: EntityId) -> &mut Self {
        self.check(field, id > 0, format!("{label} must be a positive number."))
    }

    pub fn phone_number(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            return self.check(field, false, "Phone number is required.");
        }
        let chars = value.chars().count();
        self.check(
            field,
            chars >= PHONE_MIN_CHARS,
            format!("Phone number must be at least {PHONE_MIN_CHARS} characters long."),
        )
        .check(
            field,
            chars <= PHONE_MAX_CHARS,
            format!("Phone number must not exceed {PHONE_MAX_CHARS} characters."),
        )
    }

    pub fn finish(&mut self) -> Vec<FieldError> {
        std::mem::take(&mut self.errors)
    }
}

/// True when `date_of_birth` is at least 18 years before `today`.
pub fn is_adult_on(date_of_birth: NaiveDate, today: NaiveDate) -> bool {
    today
        .checked_sub_months(Months::new(ADULT_AGE_YEARS * 12))
        .is_some_and(|cutoff| date_of_birth <= cutoff)
}
