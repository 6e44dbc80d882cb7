//! Core validation traits

use crate::error::{ValidationErrors, ValidationResult};
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Core validation trait that all validators must implement
#[async_trait]
pub trait ValidationRule: Send + Sync {
    /// Validate a single value
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()>;

    /// Get the validation rule name/type
    fn rule_name(&self) -> &'static str;

    /// Get validation rule parameters/configuration as JSON
    fn parameters(&self) -> Option<Value> {
        None
    }
}

/// Trait for validating individual fields
#[async_trait]
pub trait ValidateField: Send + Sync {
    async fn validate_field(&self, field: &str, value: &Value) -> ValidationResult<()>;
}

/// Trait for validating a whole request body (cross-field rules)
#[async_trait]
pub trait ValidateRequest: Send + Sync {
    async fn validate_request(&self, data: &Map<String, Value>) -> ValidationResult<()>;
}

/// Field validation followed by request validation, errors merged
#[async_trait]
pub trait Validate: ValidateField + ValidateRequest + Send + Sync {
    async fn validate(&self, data: &Map<String, Value>) -> ValidationResult<()> {
        let mut errors = ValidationErrors::new();

        for (field, value) in data {
            if let Err(field_errors) = self.validate_field(field, value).await {
                errors.merge(field_errors);
            }
        }

        if let Err(request_errors) = self.validate_request(data).await {
            errors.merge(request_errors);
        }

        errors.into_result()
    }
}

impl<T> Validate for T where T: ValidateField + ValidateRequest + Send + Sync {}
