use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use validator::ValidateEmail;

use crate::models::PatientStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every rule that failed for one request, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `Ok(value)` when no rule failed.
    pub fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }

    // -- Rules --

    /// Trimmed, non-empty value or a "required" error.
    pub fn required(&mut self, field: &'static str, value: Option<String>) -> String {
        match filled(value) {
            Some(v) => v,
            None => {
                self.add(field, format!("The {} field is required.", label(field)));
                String::new()
            }
        }
    }

    pub fn email(&mut self, field: &'static str, value: &str) {
        if !value.is_empty() && !value.to_owned().validate_email() {
            self.add(
                field,
                format!("The {} field must be a valid email address.", label(field)),
            );
        }
    }

    pub fn status(&mut self, field: &'static str, value: Option<String>) -> Option<PatientStatus> {
        let raw = filled(value)?;
        match raw.parse() {
            Ok(status) => Some(status),
            Err(_) => {
                self.add(field, format!("The selected {} is invalid.", label(field)));
                None
            }
        }
    }

    pub fn date(&mut self, field: &'static str, value: Option<String>) -> Option<NaiveDate> {
        let raw = filled(value)?;
        match parse_date(&raw) {
            Some(date) => Some(date),
            None => {
                self.add(field, format!("The {} field must be a valid date.", label(field)));
                None
            }
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.errors.first() else {
            return f.write_str("The given data was invalid.");
        };
        f.write_str(&first.message)?;
        match self.errors.len() - 1 {
            0 => Ok(()),
            1 => f.write_str(" (and 1 more error)"),
            n => write!(f, " (and {} more errors)", n),
        }
    }
}

impl std::error::Error for ValidationErrors {}

/// Input strings are trimmed and blank ones count as absent.
pub fn filled(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and RFC 3339, keeping the date part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

fn label(field: &str) -> String {
    field.replace('_', " ")
}
