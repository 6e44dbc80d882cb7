//! Request DTOs for the clinic API
//!
//! Each DTO declares its [`Rules`]; [`Dto::from_json`] trims, validates and
//! deserializes a raw request body in one go.

use crate::error::{ValidationError, ValidationErrors, ValidationResult};
use crate::rules::{Rules, BODY_FIELD};
use crate::validators::{
    CustomValidator, EmailValidator, NumericValidator, PatternValidator, RequiredValidator,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const RESERVATION_TYPES: [&str; 3] = ["in-clinic", "online", "home"];
pub const SLOT_TYPES: [&str; 2] = ["slots", "walk-in-windows"];
pub const WEEKDAYS: [&str; 7] = [
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
];

#[async_trait]
pub trait Dto: DeserializeOwned + Send + Sized + 'static {
    fn rules() -> Rules;

    async fn from_json(mut body: Value) -> ValidationResult<Self> {
        let rules = Self::rules();
        rules.sanitize(&mut body);
        rules.validate_value(&body).await?;

        serde_json::from_value(body).map_err(|e| {
            ValidationErrors::from(ValidationError::with_code(
                BODY_FIELD,
                format!("Malformed request body: {}", e),
                "invalid_body",
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoginDto {
    pub email: String,
    pub password: String,
}

#[async_trait]
impl Dto for LoginDto {
    fn rules() -> Rules {
        Rules::builder()
            .required_email("email")
            .required_password("password")
            .build()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserDto {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[async_trait]
impl Dto for RegisterUserDto {
    fn rules() -> Rules {
        Rules::builder()
            .required_email("email")
            .strong_password("password")
            .optional_string("name", 255)
            .trim("phone")
            .field("phone", PatternValidator::phone())
            .build()
    }
}

/// Clinic staff sign-in; doctors may belong to several clinics, so the slug is optional
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DoctorLoginDto {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub clinic_slug: Option<String>,
}

#[async_trait]
impl Dto for DoctorLoginDto {
    fn rules() -> Rules {
        Rules::builder()
            .required_email("email")
            .required_password("password")
            .trim("clinicSlug")
            .field("clinicSlug", PatternValidator::slug())
            .build()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ForgotPasswordDto {
    pub email: String,
}

#[async_trait]
impl Dto for ForgotPasswordDto {
    fn rules() -> Rules {
        Rules::builder().required_email("email").build()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordDto {
    pub token: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[async_trait]
impl Dto for ResetPasswordDto {
    fn rules() -> Rules {
        Rules::builder()
            .required_string("token", 1, 255)
            .strong_password("newPassword")
            .required_password("confirmPassword")
            .request(CustomValidator::new("passwords_match", |body, _| {
                let new_password = body.get("newPassword").and_then(Value::as_str);
                let confirm = body.get("confirmPassword").and_then(Value::as_str);
                match (new_password, confirm) {
                    (Some(a), Some(b)) if a != b => Err(ValidationError::with_code(
                        "confirmPassword",
                        "Passwords do not match",
                        "password_mismatch",
                    )
                    .into()),
                    _ => Ok(()),
                }
            }))
            .build()
    }
}

/// Partial update of a clinic's settings; absent fields stay unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSettingDto {
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub working_days: Option<Vec<String>>,
    #[serde(default)]
    pub slot_duration: Option<i32>,
    #[serde(default)]
    pub slot_type: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

#[async_trait]
impl Dto for UpdateSettingDto {
    fn rules() -> Rules {
        Rules::builder()
            .trim("currency")
            .field("currency", PatternValidator::currency_code())
            .optional_string("timezone", 64)
            .field(
                "workingDays",
                CustomValidator::new("weekdays", |value, field| {
                    let valid = value.as_array().is_some_and(|days| {
                        days.iter()
                            .all(|day| day.as_str().is_some_and(|d| WEEKDAYS.contains(&d)))
                    });
                    if valid {
                        Ok(())
                    } else {
                        Err(ValidationError::with_code(
                            field,
                            format!("{} must be a list of weekday names", field),
                            "invalid_weekdays",
                        )
                        .into())
                    }
                }),
            )
            .field(
                "slotDuration",
                NumericValidator::integer().min(5.0).max(480.0),
            )
            .one_of("slotType", &SLOT_TYPES)
            .boolean("isActive")
            .build()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientDto {
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
}

#[async_trait]
impl Dto for CreatePatientDto {
    fn rules() -> Rules {
        Rules::builder()
            .required_string("name", 1, 255)
            .required_string("phone", 6, 32)
            .field("phone", PatternValidator::phone())
            .trim("email")
            .field("email", EmailValidator::new())
            .date("dateOfBirth")
            .build()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationDto {
    pub patient_id: i64,
    #[serde(default)]
    pub doctor_id: Option<i64>,
    pub date: NaiveDate,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default, rename = "type")]
    pub reservation_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[async_trait]
impl Dto for CreateReservationDto {
    fn rules() -> Rules {
        Rules::builder()
            .required_int("patientId", 1)
            .field("doctorId", NumericValidator::integer().min(1.0))
            .field("date", RequiredValidator::new())
            .date("date")
            .trim("startTime")
            .field("startTime", RequiredValidator::new())
            .field("startTime", PatternValidator::time_hhmm())
            .trim("endTime")
            .field("endTime", PatternValidator::time_hhmm())
            .one_of("type", &RESERVATION_TYPES)
            .optional_string("notes", 2000)
            .request(CustomValidator::new("end_after_start", |body, _| {
                let start = body.get("startTime").and_then(Value::as_str);
                let end = body.get("endTime").and_then(Value::as_str);
                match (start, end) {
                    // zero-padded HH:MM compares correctly as text
                    (Some(start), Some(end)) if end <= start => Err(ValidationError::with_code(
                        "endTime",
                        "endTime must be after startTime",
                        "time_order",
                    )
                    .into()),
                    _ => Ok(()),
                }
            }))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_login_trims_email_but_not_password() {
        let dto = LoginDto::from_json(json!({"email": "  ada@clinic.com ", "password": " pw "}))
            .await
            .unwrap();
        assert_eq!(dto.email, "ada@clinic.com");
        assert_eq!(dto.password, " pw ");
    }

    #[tokio::test]
    async fn test_login_requires_both_fields() {
        let errors = LoginDto::from_json(json!({})).await.unwrap_err();
        assert!(errors.has_code("email", "required"));
        assert!(errors.has_code("password", "required"));
    }

    #[tokio::test]
    async fn test_register_requires_strong_password() {
        let errors = RegisterUserDto::from_json(json!({
            "email": "ada@clinic.com",
            "password": "password"
        }))
        .await
        .unwrap_err();
        assert!(errors.has_code("password", "password_uppercase"));
        assert!(!errors.has_field_errors("email"));
    }

    #[tokio::test]
    async fn test_doctor_login_slug() {
        let dto = DoctorLoginDto::from_json(json!({
            "email": "dr.house@clinic.com",
            "password": "x",
            "clinicSlug": " princeton-plainsboro "
        }))
        .await
        .unwrap();
        assert_eq!(dto.clinic_slug.as_deref(), Some("princeton-plainsboro"));

        assert!(DoctorLoginDto::from_json(json!({
            "email": "dr.house@clinic.com",
            "password": "x",
            "clinicSlug": "Not A Slug"
        }))
        .await
        .unwrap_err()
        .has_code("clinicSlug", "pattern_mismatch"));
    }

    #[tokio::test]
    async fn test_reset_password_mismatch() {
        let errors = ResetPasswordDto::from_json(json!({
            "token": "abc123",
            "newPassword": "NewSecureP@ss1",
            "confirmPassword": "NewSecureP@ss2"
        }))
        .await
        .unwrap_err();
        assert!(errors.has_code("confirmPassword", "password_mismatch"));
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn test_update_setting_partial() {
        let dto = UpdateSettingDto::from_json(json!({"slotType": "walk-in-windows"}))
            .await
            .unwrap();
        assert_eq!(dto.slot_type.as_deref(), Some("walk-in-windows"));
        assert_eq!(dto.currency, None);

        let errors = UpdateSettingDto::from_json(json!({
            "currency": "euro",
            "workingDays": ["monday", "funday"],
            "slotDuration": 2,
            "slotType": "queue"
        }))
        .await
        .unwrap_err();
        assert!(errors.has_code("currency", "pattern_mismatch"));
        assert!(errors.has_code("workingDays", "invalid_weekdays"));
        assert!(errors.has_code("slotDuration", "numeric_min"));
        assert!(errors.has_code("slotType", "not_in_list"));
    }

    #[tokio::test]
    async fn test_create_patient() {
        let dto = CreatePatientDto::from_json(json!({
            "name": " Ada Lovelace ",
            "phone": "+44 20 7946 0958",
            "dateOfBirth": "1815-12-10"
        }))
        .await
        .unwrap();
        assert_eq!(dto.name, "Ada Lovelace");
        assert_eq!(dto.date_of_birth, NaiveDate::from_ymd_opt(1815, 12, 10));

        let errors = CreatePatientDto::from_json(json!({
            "name": "Ada",
            "phone": "0612345678",
            "dateOfBirth": "10/12/1815"
        }))
        .await
        .unwrap_err();
        assert!(errors.has_code("dateOfBirth", "invalid_date"));
    }

    #[tokio::test]
    async fn test_create_reservation() {
        let dto = CreateReservationDto::from_json(json!({
            "patientId": 7,
            "date": "2024-06-03",
            "startTime": "09:00",
            "endTime": "09:30",
            "type": "home"
        }))
        .await
        .unwrap();
        assert_eq!(dto.reservation_type.as_deref(), Some("home"));
        assert_eq!(dto.doctor_id, None);

        let errors = CreateReservationDto::from_json(json!({
            "patientId": 0,
            "date": "2024-06-03",
            "startTime": "10:00",
            "endTime": "09:30",
            "type": "teleport"
        }))
        .await
        .unwrap_err();
        assert!(errors.has_code("patientId", "numeric_min"));
        assert!(errors.has_code("endTime", "time_order"));
        assert!(errors.has_code("type", "not_in_list"));
    }

    #[tokio::test]
    async fn test_type_mismatch_after_validation_is_reported_on_body() {
        // "7" passes the numeric rule but cannot deserialize into i64
        let errors = CreateReservationDto::from_json(json!({
            "patientId": "7",
            "date": "2024-06-03",
            "startTime": "09:00"
        }))
        .await
        .unwrap_err();
        assert!(errors.has_code(BODY_FIELD, "invalid_body"));
    }
}
