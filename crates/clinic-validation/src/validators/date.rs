//! Date and date-time validator

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

const DATE_FORMAT: &str = "%Y-%m-%d";
const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Accepts `YYYY-MM-DD`, and unless `date_only` is set, RFC 3339 or local
/// `YYYY-MM-DDTHH:MM:SS` timestamps
#[derive(Debug, Clone, Default)]
pub struct DateValidator {
    pub date_only: bool,
    pub message: Option<String>,
}

impl DateValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calendar dates only, e.g. reservation days and birthdays
    pub fn date_only() -> Self {
        Self {
            date_only: true,
            message: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn parses(&self, text: &str) -> bool {
        if NaiveDate::parse_from_str(text, DATE_FORMAT).is_ok() {
            return true;
        }
        if self.date_only {
            return false;
        }
        DateTime::parse_from_rfc3339(text).is_ok()
            || NaiveDateTime::parse_from_str(text, LOCAL_DATETIME_FORMAT).is_ok()
    }
}

#[async_trait]
impl ValidationRule for DateValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        if value.is_null() {
            return Ok(());
        }

        if value.as_str().is_some_and(|text| self.parses(text.trim())) {
            return Ok(());
        }

        let default = if self.date_only {
            format!("{} must be a date in YYYY-MM-DD format", field)
        } else {
            format!("{} must be a valid date or date-time", field)
        };
        let message = self.message.clone().unwrap_or(default);
        Err(ValidationError::with_code(field, message, "invalid_date").into())
    }

    fn rule_name(&self) -> &'static str {
        "date"
    }

    fn parameters(&self) -> Option<Value> {
        Some(serde_json::json!({ "date_only": self.date_only }))
    }
}
