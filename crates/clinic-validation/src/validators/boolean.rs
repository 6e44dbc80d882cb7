//! Boolean validator

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use async_trait::async_trait;
use serde_json::Value;

const TRUE_STRINGS: [&str; 3] = ["true", "1", "yes"];
const FALSE_STRINGS: [&str; 3] = ["false", "0", "no"];

#[derive(Debug, Clone, Default)]
pub struct BooleanValidator {
    /// Also accept form-style strings such as `"true"`, `"0"` or `"yes"`
    pub allow_strings: bool,
    pub message: Option<String>,
}

impl BooleanValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow_strings(mut self, allow: bool) -> Self {
        self.allow_strings = allow;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn accepts(&self, value: &Value) -> bool {
        match value {
            Value::Bool(_) => true,
            Value::String(s) if self.allow_strings => {
                let lowered = s.trim().to_ascii_lowercase();
                TRUE_STRINGS.contains(&lowered.as_str()) || FALSE_STRINGS.contains(&lowered.as_str())
            }
            _ => false,
        }
    }
}

#[async_trait]
impl ValidationRule for BooleanValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        if value.is_null() || self.accepts(value) {
            return Ok(());
        }
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| format!("{} must be true or false", field));
        Err(ValidationError::with_code(field, message, "invalid_boolean").into())
    }

    fn rule_name(&self) -> &'static str {
        "boolean"
    }

    fn parameters(&self) -> Option<Value> {
        Some(serde_json::json!({ "allow_strings": self.allow_strings }))
    }
}
