//! # clinic-validation
//!
//! Declarative request validation for the clinic API: rule objects composed
//! into [`Rules`], and the DTOs that trim, validate and deserialize request
//! bodies.

pub mod dto;
pub mod error;
pub mod rules;
pub mod traits;
pub mod validators;

// Re-exports for easy access
pub use dto::{
    CreatePatientDto, CreateReservationDto, DoctorLoginDto, Dto, ForgotPasswordDto, LoginDto,
    RegisterUserDto, ResetPasswordDto, UpdateSettingDto,
};
pub use error::{ValidationError, ValidationErrors, ValidationResult};
pub use rules::{Rules, RulesBuilder};
pub use traits::{Validate, ValidateField, ValidateRequest, ValidationRule};

// Built-in validators
pub use validators::{
    boolean::BooleanValidator, custom::CustomValidator, date::DateValidator,
    email::EmailValidator, length::LengthValidator, numeric::NumericValidator,
    password::StrongPasswordValidator, pattern::PatternValidator, required::RequiredValidator,
};
