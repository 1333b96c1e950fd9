//! Sign-in and registration form validation
//!
//! Forms are checked locally before anything is sent to the directory. A
//! form that fails validation never reaches the session manager.

use arena_client::NewAccount;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// Minimum password length, in characters
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Minimum username length, in characters
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Number of digits in a phone number
pub const PHONE_DIGITS: usize = 10;

/// A form input that can carry an error message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    /// Username (registration)
    Username,
    /// Email address
    Email,
    /// Password
    Password,
    /// Password confirmation (registration)
    ConfirmPassword,
    /// Phone number (registration)
    Phone,
    /// State of residence (registration)
    State,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Username => "username",
            Field::Email => "email",
            Field::Password => "password",
            Field::ConfirmPassword => "confirmPassword",
            Field::Phone => "phone",
            Field::State => "state",
        };
        f.write_str(name)
    }
}

/// Errors attached to a form
///
/// Holds at most one message per field plus an optional general message
/// that is not tied to any field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{} invalid field(s)", .fields.len())]
pub struct FieldErrors {
    fields: BTreeMap<Field, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    general: Option<String>,
}

impl FieldErrors {
    /// No errors
    pub fn new() -> Self {
        Self::default()
    }

    /// Only a general message
    pub fn general_message(message: impl Into<String>) -> Self {
        Self { fields: BTreeMap::new(), general: Some(message.into()) }
    }

    /// Whether there is nothing to show
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.general.is_none()
    }

    /// Message for one field
    pub fn get(&self, field: Field) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    /// Message not tied to a field
    pub fn general(&self) -> Option<&str> {
        self.general.as_deref()
    }

    /// Set the message for a field, replacing any previous one
    pub fn set(&mut self, field: Field, message: impl Into<String>) {
        self.fields.insert(field, message.into());
    }

    /// Set the general message
    pub fn set_general(&mut self, message: impl Into<String>) {
        self.general = Some(message.into());
    }

    /// Remove the message for a field
    pub fn clear(&mut self, field: Field) {
        self.fields.remove(&field);
    }

    /// Remove every message
    pub fn clear_all(&mut self) {
        self.fields.clear();
        self.general = None;
    }

    /// Fields with messages, in display order
    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.fields.iter().map(|(field, message)| (*field, message.as_str()))
    }

    fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn email_regex() -> &'static Regex {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    EMAIL_REGEX.get_or_init(|| Regex::new(r"\S+@\S+\.\S+").expect("email pattern compiles"))
}

fn phone_regex() -> &'static Regex {
    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    PHONE_REGEX.get_or_init(|| Regex::new(r"^\d{10}$").expect("phone pattern compiles"))
}

fn check_email(email: &str, errors: &mut FieldErrors) {
    if email.is_empty() {
        errors.set(Field::Email, "Email is required");
    } else if !email_regex().is_match(email) {
        errors.set(Field::Email, "Email is invalid");
    }
}

fn check_password(password: &str, errors: &mut FieldErrors) {
    if password.is_empty() {
        errors.set(Field::Password, "Password is required");
    } else if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.set(
            Field::Password,
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        );
    }
}

/// Email and password as typed on the login screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoginForm {
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
}

impl LoginForm {
    /// Create a form from the typed values
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }

    /// Check both fields
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        check_email(&self.email, &mut errors);
        check_password(&self.password, &mut errors);
        errors.into_result()
    }
}

/// Everything collected by the two registration steps
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    /// Username
    pub username: String,
    /// Email address
    pub email: String,
    /// Password
    pub password: String,
    /// Password typed a second time
    pub confirm_password: String,
    /// Ten-digit phone number
    pub phone: String,
    /// State of residence
    pub state: String,
}

impl RegistrationForm {
    /// Check username, email, password and confirmation
    pub fn validate_account_step(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.username.is_empty() {
            errors.set(Field::Username, "Username is required");
        } else if self.username.chars().count() < MIN_USERNAME_LENGTH {
            errors.set(
                Field::Username,
                format!("Username must be at least {MIN_USERNAME_LENGTH} characters"),
            );
        }

        check_email(&self.email, &mut errors);
        check_password(&self.password, &mut errors);

        if self.password != self.confirm_password {
            errors.set(Field::ConfirmPassword, "Passwords do not match");
        }

        errors.into_result()
    }

    /// Check phone and state
    pub fn validate_contact_step(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();

        if self.phone.is_empty() {
            errors.set(Field::Phone, "Phone number is required");
        } else if !phone_regex().is_match(&self.phone) {
            errors.set(Field::Phone, format!("Phone number must be {PHONE_DIGITS} digits"));
        }

        if self.state.is_empty() {
            errors.set(Field::State, "State is required");
        }

        errors.into_result()
    }

    /// Check both steps
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let account = self.validate_account_step();
        let contact = self.validate_contact_step();
        match (account, contact) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(errors), Ok(())) | (Ok(()), Err(errors)) => Err(errors),
            (Err(mut errors), Err(contact)) => {
                for (field, message) in contact.iter() {
                    errors.set(field, message);
                }
                Err(errors)
            }
        }
    }

    /// Registration request for the directory
    pub fn to_new_account(&self) -> NewAccount {
        NewAccount::new(&self.email, &self.password, &self.username)
            .with_phone(&self.phone)
            .with_state(&self.state)
    }
}
