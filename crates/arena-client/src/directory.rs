//! The account directory capability
//!
//! A directory validates credentials, creates accounts and resumes sessions
//! from a previously issued token. Implementations must never hand back a
//! partially filled profile: every call either yields a complete profile or
//! an error.

use crate::profile::{AuthGrant, NewAccount, SessionToken, UserProfile};
use async_trait::async_trait;
use thiserror::Error;

/// Errors returned by a [`UserDirectory`]
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// Email/password pair was rejected
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// An account with this email already exists
    #[error("Account already exists: {0}")]
    AccountExists(String),

    /// Registration input was refused by the backend
    #[error("Registration rejected: {0}")]
    Rejected(String),

    /// Session token is unknown or expired
    #[error("Session expired")]
    SessionExpired,

    /// Transport failure (connection refused, timeout, DNS)
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with an unexpected status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the server
        message: String,
    },

    /// Response body could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DirectoryError {
    /// Whether repeating the same request may succeed
    ///
    /// Transport failures, 408, 425, 429 and every 5xx status
    pub fn is_retryable(&self) -> bool {
        match self {
            DirectoryError::Network(_) => true,
            DirectoryError::Api { status, .. } => {
                matches!(status, 408 | 425 | 429 | 500..=599)
            }
            _ => false,
        }
    }
}

/// Result type for directory operations
pub type Result<T> = std::result::Result<T, DirectoryError>;

/// Source of truth for player accounts
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Check an email/password pair and open a session
    async fn validate_credentials(&self, email: &str, password: &str) -> Result<AuthGrant>;

    /// Create an account and open a session for it
    async fn register(&self, account: &NewAccount) -> Result<AuthGrant>;

    /// Exchange a stored token for the current profile
    async fn resume_session(&self, token: &SessionToken) -> Result<UserProfile>;

    /// Invalidate a token so it can no longer be resumed
    ///
    /// Ending a token the directory does not know is not an error.
    async fn end_session(&self, token: &SessionToken) -> Result<()>;
}
