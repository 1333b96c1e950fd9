//! Session manager configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for [`crate::SessionManager`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Upper bound for a single directory call
    pub request_timeout: Duration,
    /// Write the session token to the store after sign-in and sign-up
    pub persist_sessions: bool,
    /// Try the stored token during the startup check
    pub restore_sessions: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            persist_sessions: true,
            restore_sessions: true,
        }
    }
}

impl SessionConfig {
    /// Create the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the directory call timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Enable or disable token persistence
    pub fn persist_sessions(mut self, enabled: bool) -> Self {
        self.persist_sessions = enabled;
        self
    }

    /// Enable or disable restoring the stored token at startup
    pub fn restore_sessions(mut self, enabled: bool) -> Self {
        self.restore_sessions = enabled;
        self
    }
}
