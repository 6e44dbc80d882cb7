//! Closure-backed validators

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub type ValidationFn = Arc<dyn Fn(&Value, &str) -> ValidationResult<()> + Send + Sync>;

/// Validator wrapping a user-defined function. Null values are skipped.
#[derive(Clone)]
pub struct CustomValidator {
    pub name: String,
    validator: ValidationFn,
    /// Replaces the message of every error the function returns
    pub message: Option<String>,
}

impl CustomValidator {
    pub fn new<F>(name: impl Into<String>, validator: F) -> Self
    where
        F: Fn(&Value, &str) -> ValidationResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            validator: Arc::new(validator),
            message: None,
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// String must be one of `allowed`
    pub fn one_of(name: impl Into<String>, allowed: &[&str]) -> Self {
        let allowed: Vec<String> = allowed.iter().map(|v| v.to_string()).collect();
        Self::new(name, move |value, field| match value.as_str() {
            Some(text) if allowed.iter().any(|a| a == text) => Ok(()),
            Some(_) => Err(ValidationError::with_code(
                field,
                format!("{} must be one of: {}", field, allowed.join(", ")),
                "not_in_list",
            )
            .context(serde_json::json!({ "allowed": allowed }))
            .into()),
            None => Err(ValidationError::with_code(
                field,
                format!("{} must be a string", field),
                "invalid_type",
            )
            .into()),
        })
    }

    /// String must not be one of `forbidden`; other types pass
    pub fn not_one_of(name: impl Into<String>, forbidden: &[&str]) -> Self {
        let forbidden: Vec<String> = forbidden.iter().map(|v| v.to_string()).collect();
        Self::new(name, move |value, field| match value.as_str() {
            Some(text) if forbidden.iter().any(|f| f == text) => Err(ValidationError::with_code(
                field,
                format!("{} cannot be one of: {}", field, forbidden.join(", ")),
                "in_forbidden_list",
            )
            .into()),
            _ => Ok(()),
        })
    }
}

impl std::fmt::Debug for CustomValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomValidator")
            .field("name", &self.name)
            .field("message", &self.message)
            .finish()
    }
}

#[async_trait]
impl ValidationRule for CustomValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        if value.is_null() {
            return Ok(());
        }

        match ((self.validator)(value, field), &self.message) {
            (Err(mut errors), Some(message)) => {
                for error in errors.errors.values_mut().flatten() {
                    error.message = message.clone();
                }
                Err(errors)
            }
            (result, _) => result,
        }
    }

    fn rule_name(&self) -> &'static str {
        "custom"
    }

    fn parameters(&self) -> Option<Value> {
        Some(serde_json::json!({
            "name": self.name,
            "message": self.message,
        }))
    }
}
