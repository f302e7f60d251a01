//! Registration and login input rules.
//!
//! Text fields are trimmed before use; passwords are taken verbatim.

use crate::error::CoreError;

/// Message returned for every failed login, whether the usercode exists or not.
pub const INVALID_CREDENTIALS: &str = "Invalid usercode or password";

/// Message returned when a usercode is already registered.
pub const USER_EXISTS: &str = "user exists";

/// Registration fields after trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub usercode: String,
    pub password: String,
    pub user_name: String,
    pub affiliation_id: String,
    pub field: String,
    pub tank_id: String,
}

/// Raw registration input as received from a client.
#[derive(Debug, Clone, Default)]
pub struct RegistrationInput<'a> {
    pub usercode: &'a str,
    pub password: &'a str,
    /// Absent when the client already checked confirmation itself.
    pub confirm_password: Option<&'a str>,
    pub user_name: &'a str,
    pub affiliation_id: &'a str,
    pub field: &'a str,
    pub tank_id: &'a str,
}

/// Check required fields and password confirmation.
///
/// `usercode`, `password` and `user_name` are required. When a confirmation
/// is supplied it must equal the password.
pub fn validate_registration(input: &RegistrationInput<'_>) -> Result<Registration, CoreError> {
    let usercode = input.usercode.trim();
    let user_name = input.user_name.trim();

    let mut missing = Vec::new();
    if usercode.is_empty() {
        missing.push("usercode");
    }
    if input.password.is_empty() {
        missing.push("password");
    }
    if user_name.is_empty() {
        missing.push("name");
    }
    if !missing.is_empty() {
        return Err(CoreError::Validation(format!(
            "missing fields: {}",
            missing.join(", ")
        )));
    }

    if let Some(confirm) = input.confirm_password {
        if confirm != input.password {
            return Err(CoreError::Validation("passwords do not match".into()));
        }
    }

    Ok(Registration {
        usercode: usercode.to_string(),
        password: input.password.to_string(),
        user_name: user_name.to_string(),
        affiliation_id: input.affiliation_id.trim().to_string(),
        field: input.field.trim().to_string(),
        tank_id: input.tank_id.trim().to_string(),
    })
}

/// Check login input. Returns the trimmed usercode.
pub fn validate_login<'a>(usercode: &'a str, password: &str) -> Result<&'a str, CoreError> {
    let usercode = usercode.trim();
    if usercode.is_empty() || password.is_empty() {
        return Err(CoreError::Validation("missing fields".into()));
    }
    Ok(usercode)
}
