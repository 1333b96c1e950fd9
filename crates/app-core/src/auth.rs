//! Authentication service for Arena Play
//!
//! Glue between the sign-in/registration screens and the session manager:
//! forms are validated first, then submitted, and every failure comes back
//! as [`FieldErrors`] ready to be shown next to the inputs.

use crate::validation::{Field, FieldErrors, LoginForm, RegistrationForm};
use app_state::{SessionError, SessionManager};
use arena_client::UserProfile;
use std::sync::Arc;

/// Shown on both fields when the directory rejects a sign-in
pub const INVALID_LOGIN_MESSAGE: &str = "Invalid email or password";

/// Shown when the directory refuses a registration
pub const REGISTRATION_FAILED_MESSAGE: &str = "Registration failed. Please try again.";

/// Shown when the directory cannot be reached in time
pub const UNREACHABLE_MESSAGE: &str = "Could not reach the server. Please try again.";

/// Result type for authentication submissions
pub type Result<T> = std::result::Result<T, FieldErrors>;

/// Translate a sign-in failure into form errors
pub fn login_errors(error: &SessionError) -> FieldErrors {
    match error {
        SessionError::InvalidCredentials => {
            let mut errors = FieldErrors::new();
            errors.set(Field::Email, INVALID_LOGIN_MESSAGE);
            errors.set(Field::Password, INVALID_LOGIN_MESSAGE);
            errors
        }
        SessionError::TimedOut(_) | SessionError::Unavailable(_) => {
            FieldErrors::general_message(UNREACHABLE_MESSAGE)
        }
        SessionError::RegistrationFailed(_) | SessionError::SessionCheckFailed(_) => {
            FieldErrors::general_message(INVALID_LOGIN_MESSAGE)
        }
    }
}

/// Translate a registration failure into form errors
pub fn registration_errors(error: &SessionError) -> FieldErrors {
    match error {
        SessionError::TimedOut(_) | SessionError::Unavailable(_) => {
            FieldErrors::general_message(UNREACHABLE_MESSAGE)
        }
        _ => FieldErrors::general_message(REGISTRATION_FAILED_MESSAGE),
    }
}

/// Authentication service
///
/// Cheap to clone; every clone drives the same [`SessionManager`].
///
/// # Example
///
/// ```rust,no_run
/// use app_core::auth::AuthService;
/// use app_core::validation::LoginForm;
/// # use app_state::SessionManager;
/// # use std::sync::Arc;
///
/// # async fn run(session: Arc<SessionManager>) {
/// let auth = AuthService::new(session);
///
/// match auth.login(&LoginForm::new("rashid.k@example.com", "validpass")).await {
///     Ok(profile) => println!("Welcome back, {}", profile.display_name),
///     Err(errors) => println!("{:?}", errors),
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct AuthService {
    session: Arc<SessionManager>,
}

impl AuthService {
    /// Create a service over a session manager
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    /// The underlying session manager
    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    /// Validate and submit the login form
    pub async fn login(&self, form: &LoginForm) -> Result<UserProfile> {
        form.validate()?;

        self.session
            .sign_in(&form.email, &form.password)
            .await
            .map_err(|err| {
                tracing::debug!(error = %err, "login failed");
                login_errors(&err)
            })
    }

    /// Validate both registration steps and submit
    pub async fn register(&self, form: &RegistrationForm) -> Result<UserProfile> {
        form.validate()?;

        self.session
            .sign_up_account(form.to_new_account())
            .await
            .map_err(|err| {
                tracing::debug!(error = %err, "registration failed");
                registration_errors(&err)
            })
    }

    /// Sign the current player out
    pub async fn logout(&self) {
        self.session.sign_out().await;
    }
}
