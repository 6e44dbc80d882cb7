//! Required field validator

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use async_trait::async_trait;
use serde_json::Value;

/// Validator that ensures a field is present and not empty
#[derive(Debug, Clone, Default)]
pub struct RequiredValidator {
    pub message: Option<String>,
}

impl RequiredValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// Null, blank strings and empty collections count as missing; `0` and `false` do not
    fn is_empty(value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(arr) => arr.is_empty(),
            Value::Object(obj) => obj.is_empty(),
            _ => false,
        }
    }
}

#[async_trait]
impl ValidationRule for RequiredValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        if !Self::is_empty(value) {
            return Ok(());
        }

        let message = self
            .message
            .clone()
            .unwrap_or_else(|| format!("{} is required", field));
        Err(ValidationError::with_code(field, message, "required").into())
    }

    fn rule_name(&self) -> &'static str {
        "required"
    }

    fn parameters(&self) -> Option<Value> {
        self.message
            .as_ref()
            .map(|msg| serde_json::json!({ "message": msg }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_missing_values_fail() {
        let validator = RequiredValidator::new();
        for value in [Value::Null, json!(""), json!("   "), json!([]), json!({})] {
            let errors = validator.validate(&value, "email").await.unwrap_err();
            assert!(errors.has_code("email", "required"), "{:?} should be missing", value);
        }
    }

    #[tokio::test]
    async fn test_present_values_pass() {
        let validator = RequiredValidator::new();
        for value in [json!("Dr. Grey"), json!(0), json!(false), json!(["x"])] {
            assert!(validator.validate(&value, "field").await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_custom_message() {
        let validator = RequiredValidator::with_message("Please enter the patient's phone");
        let errors = validator.validate(&Value::Null, "phone").await.unwrap_err();
        assert_eq!(
            errors.get_field_errors("phone").unwrap()[0].message,
            "Please enter the patient's phone"
        );
    }
}
