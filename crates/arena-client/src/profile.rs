//! Account and session types
//!
//! The wire format is camelCase JSON, matching what the mobile backend
//! returns for `/auth/*` endpoints.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An authenticated player's account
///
/// The identifier is assigned by the directory and can only be read
/// afterwards. Every other field is plain data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    id: String,

    /// Unique handle chosen at registration
    pub username: String,

    /// Name shown in greetings and leaderboards
    pub display_name: String,

    /// Login email
    pub email: String,

    /// Phone number, empty if never provided
    #[serde(default)]
    pub phone: String,

    /// Avatar image URL, empty if unset
    #[serde(default, rename = "avatarUrl")]
    pub avatar: String,

    /// Whether the player completed KYC
    #[serde(default, rename = "isKycVerified")]
    pub kyc_verified: bool,

    /// Wallet balance in whole rupees
    #[serde(default)]
    pub wallet_balance: u64,

    /// Account creation time
    pub created_at: DateTime<Utc>,

    /// Most recent successful login
    pub last_login: DateTime<Utc>,

    /// Code the player shares for referral bonuses
    #[serde(default)]
    pub referral_code: String,

    /// State or region of residence
    #[serde(default)]
    pub state: String,
}

impl UserProfile {
    /// Create a profile with the required fields; everything else is empty
    /// and the wallet starts at zero.
    pub fn new(
        id: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        let username = username.into();
        let now = Utc::now();
        Self {
            id: id.into(),
            display_name: username.clone(),
            username,
            email: email.into(),
            phone: String::new(),
            avatar: String::new(),
            kyc_verified: false,
            wallet_balance: 0,
            created_at: now,
            last_login: now,
            referral_code: String::new(),
            state: String::new(),
        }
    }

    /// Directory-assigned identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Copy every field except the identifier, which is replaced.
    ///
    /// Used by directories that build new accounts from a template profile.
    pub fn reassigned(&self, id: impl Into<String>) -> Self {
        Self { id: id.into(), ..self.clone() }
    }

    /// First word of the display name, used by the home greeting
    pub fn first_name(&self) -> Option<&str> {
        self.display_name.split_whitespace().next()
    }
}

/// Bearer token for a directory session
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionToken {
    value: String,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    /// Create a token
    pub fn new(value: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self { value: value.into(), expires_at }
    }

    /// Create a token that expires `ttl` from now
    pub fn issue(value: impl Into<String>, ttl: Duration) -> Self {
        Self::new(value, Utc::now() + ttl)
    }

    /// Raw token value for the `Authorization` header
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Check expiry against the current clock
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check expiry against a given instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Result of a successful login or registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthGrant {
    /// The account that was authenticated
    pub profile: UserProfile,
    /// Token that can resume this session later
    pub token: SessionToken,
}

/// Registration input
#[derive(Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    /// Login email
    pub email: String,
    /// Chosen password
    pub password: String,
    /// Chosen username
    pub username: String,
    /// Phone number from the second registration step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// State or region from the second registration step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
}

impl NewAccount {
    /// Create registration input with only the required fields
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            username: username.into(),
            phone: None,
            state: None,
        }
    }

    /// Attach a phone number
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Attach a state or region
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("username", &self.username)
            .field("phone", &self.phone)
            .field("state", &self.state)
            .finish()
    }
}
