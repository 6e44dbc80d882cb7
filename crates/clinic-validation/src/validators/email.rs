//! Email format validator

use crate::error::{ValidationError, ValidationResult};
use crate::traits::ValidationRule;
use async_trait::async_trait;
use serde_json::Value;

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_LOCAL_LENGTH: usize = 64;

/// Validator for email address format
#[derive(Debug, Clone)]
pub struct EmailValidator {
    pub message: Option<String>,
    /// Require a dotted domain (`example.com`, not `localhost`)
    pub require_tld: bool,
}

impl Default for EmailValidator {
    fn default() -> Self {
        Self {
            message: None,
            require_tld: true,
        }
    }
}

impl EmailValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn require_tld(mut self, require: bool) -> Self {
        self.require_tld = require;
        self
    }

    fn valid_local(local: &str) -> bool {
        !local.is_empty()
            && local.len() <= MAX_LOCAL_LENGTH
            && !local.starts_with('.')
            && !local.ends_with('.')
            && !local.contains("..")
            && local
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.-".contains(c))
    }

    fn valid_domain(&self, domain: &str) -> bool {
        let labels: Vec<&str> = domain.split('.').collect();
        if self.require_tld && labels.len() < 2 {
            return false;
        }
        let labels_ok = labels.iter().all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        });
        let tld_ok = !self.require_tld
            || labels
                .last()
                .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));
        labels_ok && tld_ok
    }

    fn is_valid(&self, email: &str) -> bool {
        if email.len() > MAX_EMAIL_LENGTH {
            return false;
        }
        match email.rsplit_once('@') {
            Some((local, domain)) => Self::valid_local(local) && self.valid_domain(domain),
            None => false,
        }
    }
}

#[async_trait]
impl ValidationRule for EmailValidator {
    async fn validate(&self, value: &Value, field: &str) -> ValidationResult<()> {
        if value.is_null() {
            return Ok(());
        }

        let valid = value.as_str().is_some_and(|email| self.is_valid(email));
        if valid {
            return Ok(());
        }

        let message = self
            .message
            .clone()
            .unwrap_or_else(|| format!("{} must be a valid email address", field));
        Err(ValidationError::with_code(field, message, "invalid_email").into())
    }

    fn rule_name(&self) -> &'static str {
        "email"
    }

    fn parameters(&self) -> Option<Value> {
        Some(serde_json::json!({ "require_tld": self.require_tld }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_valid_addresses() {
        let validator = EmailValidator::new();
        for email in [
            "doctor@clinic.com",
            "front.desk+berlin@downtown-dental.de",
            "o'brien@example.co.uk",
        ] {
            assert!(validator.validate(&json!(email), "email").await.is_ok(), "{}", email);
        }
    }

    #[tokio::test]
    async fn test_invalid_addresses() {
        let validator = EmailValidator::new();
        for email in [
            "not-an-email",
            "@clinic.com",
            "doctor@",
            "doctor@clinic",
            "doc..tor@clinic.com",
            "doctor@-clinic.com",
            "doctor@clinic.c0m",
        ] {
            let errors = validator.validate(&json!(email), "email").await.unwrap_err();
            assert!(errors.has_code("email", "invalid_email"), "{}", email);
        }
    }

    #[tokio::test]
    async fn test_without_tld() {
        let validator = EmailValidator::new().require_tld(false);
        assert!(validator.validate(&json!("admin@localhost"), "email").await.is_ok());
    }

    #[tokio::test]
    async fn test_non_string_and_null() {
        let validator = EmailValidator::new();
        assert!(validator.validate(&json!(42), "email").await.is_err());
        assert!(validator.validate(&Value::Null, "email").await.is_ok());
    }
}
