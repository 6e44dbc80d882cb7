//! Numeric range validator

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use async_trait::async_trait;
use serde_json::Value;

/// Validator for numbers, including numbers sent as strings (`"30"`)
#[derive(Debug, Clone, Default)]
pub struct NumericValidator {
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Reject values with a fractional part
    pub integer_only: bool,
    pub message: Option<String>,
}

impl NumericValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole numbers only
    pub fn integer() -> Self {
        Self::new().integer_only(true)
    }

    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn integer_only(mut self, integer_only: bool) -> Self {
        self.integer_only = integer_only;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    fn parse(value: &Value) -> Option<f64> {
        match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    fn error(&self, field: &str, default: String, code: &str) -> ValidationResult<()> {
        let message = self.message.clone().unwrap_or(default);
        Err(ValidationError::with_code(field, message, code).into())
    }
}

#[async_trait]
impl ValidationRule for NumericValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        if value.is_null() {
            return Ok(());
        }

        let Some(number) = Self::parse(value) else {
            return self.error(field, format!("{} must be a number", field), "invalid_number");
        };

        if self.integer_only && number.fract() != 0.0 {
            return self.error(field, format!("{} must be a whole number", field), "not_integer");
        }
        if let Some(min) = self.min {
            if number < min {
                return self.error(field, format!("{} must be at least {}", field, min), "numeric_min");
            }
        }
        if let Some(max) = self.max {
            if number > max {
                return self.error(field, format!("{} must be at most {}", field, max), "numeric_max");
            }
        }
        Ok(())
    }

    fn rule_name(&self) -> &'static str {
        "numeric"
    }

    fn parameters(&self) -> Option<Value> {
        Some(serde_json::json!({
            "min": self.min,
            "max": self.max,
            "integer_only": self.integer_only,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_range_and_strings() {
        let validator = NumericValidator::integer().min(0.0).max(6.0);

        assert!(validator.validate(&json!(0), "dayOfWeek").await.is_ok());
        assert!(validator.validate(&json!("6"), "dayOfWeek").await.is_ok());
        assert!(validator
            .validate(&json!(7), "dayOfWeek")
            .await
            .unwrap_err()
            .has_code("dayOfWeek", "numeric_max"));
        assert!(validator
            .validate(&json!(-1), "dayOfWeek")
            .await
            .unwrap_err()
            .has_code("dayOfWeek", "numeric_min"));
    }

    #[tokio::test]
    async fn test_integer_only() {
        let validator = NumericValidator::integer();
        assert!(validator
            .validate(&json!(2.5), "slotDuration")
            .await
            .unwrap_err()
            .has_code("slotDuration", "not_integer"));
        assert!(NumericValidator::new().validate(&json!(2.5), "price").await.is_ok());
    }

    #[tokio::test]
    async fn test_non_numbers() {
        let validator = NumericValidator::new();
        for value in [json!("thirty"), json!(true), json!([1])] {
            assert!(validator
                .validate(&value, "age")
                .await
                .unwrap_err()
                .has_code("age", "invalid_number"));
        }
        assert!(validator.validate(&Value::Null, "age").await.is_ok());
    }
}
