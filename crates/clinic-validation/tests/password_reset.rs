//! Password reset request validation

use clinic_validation::{Dto, ResetPasswordDto, Validate};
use serde_json::json;

#[tokio::test]
async fn rejects_short_password_without_uppercase_or_symbol() {
    let errors = ResetPasswordDto::from_json(json!({
        "token": "d41d8cd98f00b204",
        "newPassword": "short1",
        "confirmPassword": "short1"
    }))
    .await
    .unwrap_err();

    assert!(errors.has_code("newPassword", "password_too_short"));
    assert!(errors.has_code("newPassword", "password_uppercase"));
    assert!(errors.has_code("newPassword", "password_symbol"));
    assert!(!errors.has_field_errors("confirmPassword"));

    let body = errors.to_json();
    assert_eq!(body["error"]["code"], "validation_failed");
    assert_eq!(body["error"]["fields"]["newPassword"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn accepts_strong_matching_password() {
    let dto = ResetPasswordDto::from_json(json!({
        "token": " d41d8cd98f00b204 ",
        "newPassword": "NewSecureP@ss1",
        "confirmPassword": "NewSecureP@ss1"
    }))
    .await
    .unwrap();

    assert_eq!(dto.token, "d41d8cd98f00b204");
    assert_eq!(dto.new_password, "NewSecureP@ss1");
}

#[tokio::test]
async fn missing_token_is_required() {
    let errors = ResetPasswordDto::from_json(json!({
        "newPassword": "NewSecureP@ss1",
        "confirmPassword": "NewSecureP@ss1"
    }))
    .await
    .unwrap_err();

    assert!(errors.has_code("token", "required"));
    assert_eq!(errors.len(), 1);
}

#[tokio::test]
async fn rules_compose_through_validate_trait() {
    let rules = ResetPasswordDto::rules();
    let body = json!({
        "token": "abc",
        "newPassword": "NewSecureP@ss1",
        "confirmPassword": "different"
    });

    let errors = rules
        .validate(body.as_object().unwrap())
        .await
        .unwrap_err();
    assert!(errors.has_code("confirmPassword", "password_mismatch"));
}
