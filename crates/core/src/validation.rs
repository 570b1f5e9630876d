//! Input validation for login and registration payloads.
//!
//! Limits mirror the column sizes in the `users` table and bcrypt-era
//! password bounds (72 bytes) kept for compatibility with existing clients.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::CoreError;

pub const MIN_NAME_LENGTH: usize = 3;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_EMAIL_LENGTH: usize = 255;
/// Logins accept an email, so the identifier limit matches the email limit.
pub const MAX_LOGIN_IDENTIFIER_LENGTH: usize = MAX_EMAIL_LENGTH;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 72;
pub const MAX_PHONE_LENGTH: usize = 20;

/// Deliberately loose: one `@`, no whitespace, a dot in the domain.
pub const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("valid regex"));

/// Fields submitted to `POST /auth/register`.
#[derive(Debug, Clone)]
pub struct RegistrationInput<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub phone_number: Option<&'a str>,
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub confirm_password: &'a str,
}

/// Validate a login payload. Only presence and upper bounds are checked so
/// that the response does not reveal which accounts exist.
pub fn validate_login(identifier: &str, password: &str) -> Result<(), CoreError> {
    if identifier.trim().is_empty() {
        return Err(CoreError::Validation("email is required".into()));
    }
    if identifier.len() > MAX_LOGIN_IDENTIFIER_LENGTH {
        return Err(CoreError::Validation(format!(
            "email must be at most {MAX_LOGIN_IDENTIFIER_LENGTH} characters"
        )));
    }
    if password.is_empty() {
        return Err(CoreError::Validation("password is required".into()));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Validate every field of a registration payload, stopping at the first error.
pub fn validate_registration(input: &RegistrationInput<'_>) -> Result<(), CoreError> {
    validate_length("first_name", input.first_name, MIN_NAME_LENGTH, MAX_NAME_LENGTH)?;
    validate_length("last_name", input.last_name, MIN_NAME_LENGTH, MAX_NAME_LENGTH)?;
    validate_length("username", input.username, MIN_NAME_LENGTH, MAX_NAME_LENGTH)?;
    if input.username.contains('@') {
        return Err(CoreError::Validation("username must not contain '@'".into()));
    }
    validate_email(input.email)?;

    if let Some(phone) = input.phone_number {
        if phone.len() > MAX_PHONE_LENGTH {
            return Err(CoreError::Validation(format!(
                "phone_number must be at most {MAX_PHONE_LENGTH} characters"
            )));
        }
    }

    validate_password_strength(input.password)?;
    if input.password != input.confirm_password {
        return Err(CoreError::Validation(
            "confirm_password must match password".into(),
        ));
    }
    Ok(())
}

/// Validate an email address format and length.
pub fn validate_email(email: &str) -> Result<(), CoreError> {
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(CoreError::Validation(format!(
            "email must be at most {MAX_EMAIL_LENGTH} characters"
        )));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(CoreError::Validation("email is not a valid address".into()));
    }
    Ok(())
}

/// Validate that a password is within the accepted length range.
pub fn validate_password_strength(password: &str) -> Result<(), CoreError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "password must be at most {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), CoreError> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Err(CoreError::Validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    Ok(())
}
