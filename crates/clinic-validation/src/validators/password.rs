//! Password strength validator

use crate::error::{ValidationError, ValidationErrors, ValidationResult};
use crate::traits::ValidationRule;
use async_trait::async_trait;
use serde_json::Value;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Requires 8 to 128 characters with at least one lowercase letter, one
/// uppercase letter, one digit and one symbol. Letters and digits are ASCII
/// only; any other character counts as a symbol. Every unmet requirement is
/// reported as its own error.
#[derive(Debug, Clone)]
pub struct StrongPasswordValidator {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for StrongPasswordValidator {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            max_length: MAX_PASSWORD_LENGTH,
        }
    }
}

impl StrongPasswordValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.min_length = min;
        self
    }

    fn check(&self, password: &str, field: &str) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        let length = password.chars().count();

        if length < self.min_length {
            errors.add(ValidationError::with_code(
                field,
                format!("{} must be at least {} characters long", field, self.min_length),
                "password_too_short",
            ));
        }
        if length > self.max_length {
            errors.add(ValidationError::with_code(
                field,
                format!("{} must be at most {} characters long", field, self.max_length),
                "password_too_long",
            ));
        }

        let requirements: [(fn(char) -> bool, &str, &str); 4] = [
            (|c| c.is_ascii_lowercase(), "a lowercase letter", "password_lowercase"),
            (|c| c.is_ascii_uppercase(), "an uppercase letter", "password_uppercase"),
            (|c| c.is_ascii_digit(), "a digit", "password_digit"),
            (|c| !c.is_ascii_alphanumeric(), "a special character", "password_symbol"),
        ];
        for (predicate, description, code) in requirements {
            if !password.chars().any(predicate) {
                errors.add(ValidationError::with_code(
                    field,
                    format!("{} must contain {}", field, description),
                    code,
                ));
            }
        }

        errors
    }
}

#[async_trait]
impl ValidationRule for StrongPasswordValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        match value {
            Value::Null => Ok(()),
            Value::String(password) => self.check(password, field).into_result(),
            _ => Err(ValidationError::with_code(
                field,
                format!("{} must be a string", field),
                "invalid_type",
            )
            .into()),
        }
    }

    fn rule_name(&self) -> &'static str {
        "strong_password"
    }

    fn parameters(&self) -> Option<Value> {
        Some(serde_json::json!({
            "min_length": self.min_length,
            "max_length": self.max_length,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_strong_password_accepted() {
        let validator = StrongPasswordValidator::new();
        assert!(validator.validate(&json!("NewSecureP@ss1"), "newPassword").await.is_ok());
    }

    #[tokio::test]
    async fn test_each_missing_requirement_reported() {
        let validator = StrongPasswordValidator::new();
        let errors = validator
            .validate(&json!("short1"), "newPassword")
            .await
            .unwrap_err();

        assert!(errors.has_code("newPassword", "password_too_short"));
        assert!(errors.has_code("newPassword", "password_uppercase"));
        assert!(errors.has_code("newPassword", "password_symbol"));
        assert!(!errors.has_code("newPassword", "password_lowercase"));
        assert!(!errors.has_code("newPassword", "password_digit"));
        assert_eq!(errors.total_errors(), 3);
    }

    #[tokio::test]
    async fn test_accented_letters_do_not_count_as_cased() {
        let errors = StrongPasswordValidator::new()
            .validate(&json!("ÉÉÉÉéééé1!"), "password")
            .await
            .unwrap_err();

        assert!(errors.has_code("password", "password_lowercase"));
        assert!(errors.has_code("password", "password_uppercase"));
        assert!(!errors.has_code("password", "password_digit"));
        assert!(!errors.has_code("password", "password_symbol"));
        assert!(!errors.has_code("password", "password_too_short"));
    }

    #[tokio::test]
    async fn test_too_long() {
        let password = format!("Aa1!{}", "x".repeat(MAX_PASSWORD_LENGTH));
        let errors = StrongPasswordValidator::new()
            .validate(&json!(password), "password")
            .await
            .unwrap_err();
        assert!(errors.has_code("password", "password_too_long"));
    }
}
