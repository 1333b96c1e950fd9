//! Core application logic for Arena Play
//!
//! Form validation for the sign-in and registration screens and the
//! [`auth::AuthService`] that submits them to the session manager.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod validation;

pub use auth::AuthService;
pub use validation::{Field, FieldErrors, LoginForm, RegistrationForm};
