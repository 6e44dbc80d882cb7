//! Built-in validators

pub mod boolean;
pub mod custom;
pub mod date;
pub mod email;
pub mod length;
pub mod numeric;
pub mod password;
pub mod pattern;
pub mod required;

pub use boolean::BooleanValidator;
pub use custom::CustomValidator;
pub use date::DateValidator;
pub use email::EmailValidator;
pub use length::LengthValidator;
pub use numeric::NumericValidator;
pub use password::StrongPasswordValidator;
pub use pattern::PatternValidator;
pub use required::RequiredValidator;
