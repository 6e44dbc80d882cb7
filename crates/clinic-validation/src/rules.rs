//! Validation rules builder and composition system

use crate::error::{ValidationError, ValidationErrors, ValidationResult};
use crate::traits::{ValidateField, ValidateRequest, ValidationRule};
use crate::validators::*;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Field name used for errors about the request as a whole
pub const BODY_FIELD: &str = "body";

/// Collection of validation rules for a request body
#[derive(Clone, Default)]
pub struct Rules {
    field_rules: BTreeMap<String, Vec<Arc<dyn ValidationRule>>>,
    /// Cross-field rules; they receive the whole body under the field name `request`
    request_rules: Vec<Arc<dyn ValidationRule>>,
    /// String fields trimmed by [`Rules::sanitize`]
    trimmed: BTreeSet<String>,
}

impl std::fmt::Debug for Rules {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rules")
            .field("validated_fields", &self.validated_fields())
            .field("request_rules_count", &self.request_rules.len())
            .field("trimmed", &self.trimmed)
            .finish()
    }
}

impl Rules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand builder for the common field shapes
    pub fn builder() -> RulesBuilder {
        RulesBuilder::new()
    }

    /// Add a validation rule for a specific field
    pub fn field<R>(mut self, field: impl Into<String>, rule: R) -> Self
    where
        R: ValidationRule + 'static,
    {
        self.field_rules
            .entry(field.into())
            .or_default()
            .push(Arc::new(rule));
        self
    }

    /// Add a request-level validation rule (cross-field validation)
    pub fn request<R>(mut self, rule: R) -> Self
    where
        R: ValidationRule + 'static,
    {
        self.request_rules.push(Arc::new(rule));
        self
    }

    /// Trim surrounding whitespace from this field before validation
    pub fn trim(mut self, field: impl Into<String>) -> Self {
        self.trimmed.insert(field.into());
        self
    }

    pub fn get_field_rules(&self, field: &str) -> Option<&Vec<Arc<dyn ValidationRule>>> {
        self.field_rules.get(field)
    }

    pub fn get_request_rules(&self) -> &[Arc<dyn ValidationRule>] {
        &self.request_rules
    }

    pub fn is_empty(&self) -> bool {
        self.field_rules.is_empty() && self.request_rules.is_empty()
    }

    pub fn validated_fields(&self) -> Vec<&str> {
        self.field_rules.keys().map(String::as_str).collect()
    }

    pub fn is_trimmed(&self, field: &str) -> bool {
        self.trimmed.contains(field)
    }

    /// Trim the configured string fields in place. Non-object bodies and
    /// non-string values are left alone.
    pub fn sanitize(&self, body: &mut Value) {
        let Some(object) = body.as_object_mut() else {
            return;
        };
        for field in &self.trimmed {
            if let Some(Value::String(text)) = object.get_mut(field) {
                let trimmed = text.trim().to_string();
                if trimmed.len() != text.len() {
                    *text = trimmed;
                }
            }
        }
    }

    /// Validate a request body. Every field with rules is checked, a missing
    /// field being validated as `null`, then the request-level rules run.
    pub async fn validate_value(&self, body: &Value) -> ValidationResult<()> {
        let Some(object) = body.as_object() else {
            return Err(ValidationError::with_code(
                BODY_FIELD,
                "Request body must be a JSON object",
                "invalid_body",
            )
            .into());
        };

        let mut errors = ValidationErrors::new();
        for field in self.field_rules.keys() {
            let value = object.get(field).unwrap_or(&Value::Null);
            if let Err(field_errors) = self.validate_field(field, value).await {
                errors.merge(field_errors);
            }
        }
        if let Err(request_errors) = self.validate_request(object).await {
            errors.merge(request_errors);
        }
        errors.into_result()
    }
}

#[async_trait]
impl ValidateField for Rules {
    async fn validate_field(&self, field: &str, value: &Value) -> ValidationResult<()> {
        let Some(rules) = self.field_rules.get(field) else {
            return Ok(());
        };

        let mut errors = ValidationErrors::new();
        for rule in rules {
            if let Err(rule_errors) = rule.validate(value, field).await {
                errors.merge(rule_errors);
            }
        }
        errors.into_result()
    }
}

#[async_trait]
impl ValidateRequest for Rules {
    async fn validate_request(&self, data: &Map<String, Value>) -> ValidationResult<()> {
        if self.request_rules.is_empty() {
            return Ok(());
        }

        let body = Value::Object(data.clone());
        let mut errors = ValidationErrors::new();
        for rule in &self.request_rules {
            if let Err(rule_errors) = rule.validate(&body, "request").await {
                errors.merge(rule_errors);
            }
        }
        errors.into_result()
    }
}

/// Builder with one method per common field shape
#[derive(Debug, Default)]
pub struct RulesBuilder {
    rules: Rules,
}

impl RulesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<R>(mut self, field: &str, rule: R) -> Self
    where
        R: ValidationRule + 'static,
    {
        self.rules = self.rules.field(field, rule);
        self
    }

    pub fn request<R>(mut self, rule: R) -> Self
    where
        R: ValidationRule + 'static,
    {
        self.rules = self.rules.request(rule);
        self
    }

    pub fn trim(mut self, field: &str) -> Self {
        self.rules = self.rules.trim(field);
        self
    }

    /// Required, trimmed string of `min..=max` characters
    pub fn required_string(self, field: &str, min: usize, max: usize) -> Self {
        self.trim(field)
            .field(field, RequiredValidator::new())
            .field(field, LengthValidator::new().range(min, max))
    }

    /// Optional, trimmed string of at most `max` characters
    pub fn optional_string(self, field: &str, max: usize) -> Self {
        self.trim(field)
            .field(field, LengthValidator::new().max(max))
    }

    /// Required, trimmed email address
    pub fn required_email(self, field: &str) -> Self {
        self.trim(field)
            .field(field, RequiredValidator::new())
            .field(field, EmailValidator::new())
            .field(field, LengthValidator::new().max(255))
    }

    /// Required password; never trimmed
    pub fn required_password(self, field: &str) -> Self {
        self.field(field, RequiredValidator::new())
    }

    /// Required password meeting the strength policy; never trimmed
    pub fn strong_password(self, field: &str) -> Self {
        self.field(field, RequiredValidator::new())
            .field(field, StrongPasswordValidator::new())
    }

    /// Required whole number no lower than `min`
    pub fn required_int(self, field: &str, min: i64) -> Self {
        self.field(field, RequiredValidator::new())
            .field(field, NumericValidator::integer().min(min as f64))
    }

    /// Optional `YYYY-MM-DD` date
    pub fn date(self, field: &str) -> Self {
        self.field(field, DateValidator::date_only())
    }

    pub fn boolean(self, field: &str) -> Self {
        self.field(field, BooleanValidator::new())
    }

    /// Optional string restricted to `allowed`
    pub fn one_of(self, field: &str, allowed: &[&str]) -> Self {
        self.field(field, CustomValidator::one_of(format!("{}_one_of", field), allowed))
    }

    pub fn build(self) -> Rules {
        self.rules
    }
}
