//! Length constraints for strings and arrays

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use async_trait::async_trait;
use serde_json::Value;

/// Validator for string/array length constraints. Strings are measured in characters.
#[derive(Debug, Clone, Default)]
pub struct LengthValidator {
    /// Minimum length (inclusive)
    pub min: Option<usize>,
    /// Maximum length (inclusive)
    pub max: Option<usize>,
    /// Exact length required; takes precedence over min/max
    pub exact: Option<usize>,
    pub message: Option<String>,
}

impl LengthValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min(mut self, min: usize) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    pub fn exact(mut self, exact: usize) -> Self {
        self.exact = Some(exact);
        self
    }

    pub fn range(self, min: usize, max: usize) -> Self {
        self.min(min).max(max)
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn describe_limit(&self, field: &str) -> String {
        if let Some(ref custom) = self.message {
            return custom.clone();
        }
        if let Some(exact) = self.exact {
            return format!("{} must be exactly {} characters long", field, exact);
        }
        match (self.min, self.max) {
            (Some(min), Some(max)) => {
                format!("{} must be between {} and {} characters long", field, min, max)
            }
            (Some(min), None) => format!("{} must be at least {} characters long", field, min),
            (None, Some(max)) => format!("{} must be at most {} characters long", field, max),
            (None, None) => format!("{} has an invalid length", field),
        }
    }

    fn fail(&self, field: &str, code: &str) -> ValidationResult<()> {
        Err(ValidationError::with_code(field, self.describe_limit(field), code).into())
    }
}

#[async_trait]
impl ValidationRule for LengthValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        // Null is the required validator's concern
        let length = match value {
            Value::Null => return Ok(()),
            Value::String(s) => s.chars().count(),
            Value::Array(items) => items.len(),
            _ => {
                return Err(ValidationError::with_code(
                    field,
                    format!("{} must be a string or array", field),
                    "invalid_type",
                )
                .into())
            }
        };

        if let Some(exact) = self.exact {
            return if length == exact {
                Ok(())
            } else {
                self.fail(field, "length_exact")
            };
        }
        if self.min.is_some_and(|min| length < min) {
            return self.fail(field, "length_min");
        }
        if self.max.is_some_and(|max| length > max) {
            return self.fail(field, "length_max");
        }
        Ok(())
    }

    fn rule_name(&self) -> &'static str {
        "length"
    }

    fn parameters(&self) -> Option<Value> {
        Some(serde_json::json!({
            "min": self.min,
            "max": self.max,
            "exact": self.exact,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_range() {
        let validator = LengthValidator::new().range(2, 5);

        assert!(validator.validate(&json!("ab"), "name").await.is_ok());
        assert!(validator.validate(&json!("abcde"), "name").await.is_ok());

        let errors = validator.validate(&json!("a"), "name").await.unwrap_err();
        assert!(errors.has_code("name", "length_min"));
        assert_eq!(
            errors.get_field_errors("name").unwrap()[0].message,
            "name must be between 2 and 5 characters long"
        );

        let errors = validator.validate(&json!("abcdef"), "name").await.unwrap_err();
        assert!(errors.has_code("name", "length_max"));
    }

    #[tokio::test]
    async fn test_exact_counts_characters() {
        let validator = LengthValidator::new().exact(3);
        assert!(validator.validate(&json!("EUR"), "currency").await.is_ok());
        assert!(validator.validate(&json!("€€€"), "currency").await.is_ok());
        assert!(validator
            .validate(&json!("EURO"), "currency")
            .await
            .unwrap_err()
            .has_code("currency", "length_exact"));
    }

    #[tokio::test]
    async fn test_null_skipped_and_numbers_rejected() {
        let validator = LengthValidator::new().max(10);
        assert!(validator.validate(&Value::Null, "notes").await.is_ok());
        assert!(validator
            .validate(&json!(42), "notes")
            .await
            .unwrap_err()
            .has_code("notes", "invalid_type"));
    }

    #[tokio::test]
    async fn test_arrays() {
        let validator = LengthValidator::new().min(1);
        assert!(validator.validate(&json!(["mon"]), "days").await.is_ok());
        assert!(validator.validate(&json!([]), "days").await.is_err());
    }
}
