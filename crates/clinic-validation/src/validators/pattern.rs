//! Regular expression validator and the platform's common formats

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

const PHONE_PATTERN: &str = r"^\+?[0-9][0-9 ()\-]{5,19}$";
const SLUG_PATTERN: &str = r"^[a-z0-9]+(?:-[a-z0-9]+)*$";
const TIME_PATTERN: &str = r"^(?:[01][0-9]|2[0-3]):[0-5][0-9]$";
const CURRENCY_PATTERN: &str = r"^[A-Z]{3}$";

/// Validator for regex pattern matching.
///
/// A pattern that fails to compile is kept as an error and reported as
/// `invalid_pattern` on every validation, so the preset constructors never
/// panic. Use [`PatternValidator::new`] to surface the compile error early.
#[derive(Debug, Clone)]
pub struct PatternValidator {
    pattern: String,
    regex: Result<Regex, regex::Error>,
    pub message: Option<String>,
    /// Require the whole string to match rather than any substring
    pub full_match: bool,
}

impl PatternValidator {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(|regex| Self {
            pattern: pattern.to_string(),
            regex: Ok(regex),
            message: None,
            full_match: false,
        })
    }

    fn preset(pattern: &str, message: &str) -> Self {
        Self {
            pattern: pattern.to_string(),
            regex: Regex::new(pattern),
            message: Some(message.to_string()),
            full_match: true,
        }
    }

    /// International phone number: digits with optional `+`, spaces, dashes and parentheses
    pub fn phone() -> Self {
        Self::preset(PHONE_PATTERN, "Please provide a valid phone number")
    }

    /// Lowercase URL slug such as `downtown-dental`
    pub fn slug() -> Self {
        Self::preset(
            SLUG_PATTERN,
            "Slug may only contain lowercase letters, digits and single dashes",
        )
    }

    /// 24h `HH:MM`
    pub fn time_hhmm() -> Self {
        Self::preset(TIME_PATTERN, "Time must use the HH:MM format")
    }

    /// ISO 4217 currency code
    pub fn currency_code() -> Self {
        Self::preset(CURRENCY_PATTERN, "Currency must be a three-letter ISO code")
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn full_match(mut self, full_match: bool) -> Self {
        self.full_match = full_match;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    fn matches(regex: &Regex, text: &str, full_match: bool) -> bool {
        if full_match {
            regex
                .find(text)
                .is_some_and(|m| m.start() == 0 && m.end() == text.len())
        } else {
            regex.is_match(text)
        }
    }
}

#[async_trait]
impl ValidationRule for PatternValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        if value.is_null() {
            return Ok(());
        }

        let regex = match &self.regex {
            Ok(regex) => regex,
            Err(e) => {
                return Err(ValidationError::with_code(
                    field,
                    format!("Invalid pattern for {}: {}", field, e),
                    "invalid_pattern",
                )
                .into())
            }
        };

        let Some(text) = value.as_str() else {
            return Err(ValidationError::with_code(
                field,
                format!("{} must be a string", field),
                "invalid_type",
            )
            .into());
        };

        if Self::matches(regex, text, self.full_match) {
            return Ok(());
        }

        let message = self
            .message
            .clone()
            .unwrap_or_else(|| format!("{} format is invalid", field));
        Err(ValidationError::with_code(field, message, "pattern_mismatch")
            .context(serde_json::json!({ "pattern": self.pattern }))
            .into())
    }

    fn rule_name(&self) -> &'static str {
        "pattern"
    }

    fn parameters(&self) -> Option<Value> {
        Some(serde_json::json!({
            "pattern": self.pattern,
            "full_match": self.full_match,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_rejects_bad_regex() {
        assert!(PatternValidator::new("([a-z").is_err());
    }

    #[tokio::test]
    async fn test_full_match_vs_substring() {
        let loose = PatternValidator::new(r"\d{3}").unwrap();
        assert!(loose.validate(&json!("room 101"), "code").await.is_ok());

        let strict = loose.full_match(true);
        assert!(strict.validate(&json!("101"), "code").await.is_ok());
        assert!(strict
            .validate(&json!("room 101"), "code")
            .await
            .unwrap_err()
            .has_code("code", "pattern_mismatch"));
    }

    #[tokio::test]
    async fn test_phone() {
        let validator = PatternValidator::phone();
        for phone in ["+1 (555) 010-2030", "0612345678", "+33 6 12 34 56 78"] {
            assert!(validator.validate(&json!(phone), "phone").await.is_ok(), "{}", phone);
        }
        for phone in ["call me", "12", "+1 555 abc"] {
            assert!(validator.validate(&json!(phone), "phone").await.is_err(), "{}", phone);
        }
    }

    #[tokio::test]
    async fn test_slug_time_and_currency() {
        assert!(PatternValidator::slug().validate(&json!("downtown-dental"), "slug").await.is_ok());
        assert!(PatternValidator::slug().validate(&json!("Downtown--Dental"), "slug").await.is_err());

        assert!(PatternValidator::time_hhmm().validate(&json!("09:30"), "startTime").await.is_ok());
        assert!(PatternValidator::time_hhmm().validate(&json!("24:00"), "startTime").await.is_err());

        assert!(PatternValidator::currency_code().validate(&json!("EUR"), "currency").await.is_ok());
        assert!(PatternValidator::currency_code().validate(&json!("eur"), "currency").await.is_err());
    }

    #[tokio::test]
    async fn test_non_string_rejected() {
        let errors = PatternValidator::slug()
            .validate(&json!(12), "slug")
            .await
            .unwrap_err();
        assert!(errors.has_code("slug", "invalid_type"));
    }
}
