//! Session state machine
//!
//! [`SessionManager`] decides who is signed in. It moves between four
//! phases:
//!
//! ```text
//! Initializing ──check──▶ Anonymous ◀──sign_out── Authenticated
//!      │                    │    ▲                     ▲
//!      │                    ▼    │ failure             │
//!      │               Authenticating ───success───────┘
//!      └────────────check (stored token valid)─────────┘
//! ```
//!
//! Every operation runs under one async mutex, so overlapping calls are
//! applied in the order they were issued. Directory calls are bounded by
//! [`SessionConfig::request_timeout`]. Dropping an operation's future before
//! it finishes discards the result: the phase and loading flag are put back
//! and no navigation happens.
//!
//! Screens never mutate state. They read [`SessionSnapshot`]s, either on
//! demand through [`SessionManager::snapshot`] or by holding a receiver from
//! [`SessionManager::subscribe`].

use crate::config::SessionConfig;
use crate::router::Router;
use arena_client::{AuthGrant, DirectoryError, NewAccount, SessionToken, UserDirectory, UserProfile};
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use storage::{MemorySessionStore, SessionStore, StoredSession};
use tokio::sync::{watch, Mutex};

/// Session-related errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The directory rejected the email/password pair
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// The directory refused to create the account
    #[error("Registration failed: {0}")]
    RegistrationFailed(String),

    /// The stored session could not be restored
    ///
    /// Only used internally; the startup check falls back to signed out.
    #[error("Session check failed: {0}")]
    SessionCheckFailed(String),

    /// The directory did not answer within the configured timeout
    #[error("{0} timed out")]
    TimedOut(&'static str),

    /// The directory could not be reached
    #[error("Directory unavailable: {0}")]
    Unavailable(#[source] DirectoryError),
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// Lifecycle phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// Startup check has not finished
    Initializing,
    /// Nobody is signed in
    Anonymous,
    /// A sign-in or sign-up is in flight
    Authenticating,
    /// A player is signed in
    Authenticated,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionPhase::Initializing => "initializing",
            SessionPhase::Anonymous => "anonymous",
            SessionPhase::Authenticating => "authenticating",
            SessionPhase::Authenticated => "authenticated",
        };
        f.write_str(name)
    }
}

/// Read-only view of the session at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    phase: SessionPhase,
    profile: Option<UserProfile>,
    is_loading: bool,
}

impl SessionSnapshot {
    fn initializing() -> Self {
        Self { phase: SessionPhase::Initializing, profile: None, is_loading: true }
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// The signed-in player, if any
    pub fn profile(&self) -> Option<&UserProfile> {
        self.profile.as_ref()
    }

    /// Whether a session check, sign-in or sign-up is outstanding
    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Whether a player is signed in
    pub fn is_authenticated(&self) -> bool {
        self.profile.is_some()
    }
}

/// Marks an operation as outstanding until it is committed.
///
/// Dropping it uncommitted (failure, cancellation, timeout) restores the
/// phase and loading flag that were current when it began.
struct PendingTransition<'a> {
    state: &'a watch::Sender<SessionSnapshot>,
    restore_phase: SessionPhase,
    restore_loading: bool,
    armed: bool,
}

impl<'a> PendingTransition<'a> {
    fn begin(state: &'a watch::Sender<SessionSnapshot>, phase: SessionPhase) -> Self {
        let (restore_phase, restore_loading) = {
            let current = state.borrow();
            (current.phase, current.is_loading)
        };
        state.send_modify(|snapshot| {
            snapshot.phase = phase;
            snapshot.is_loading = true;
        });

        Self { state, restore_phase, restore_loading, armed: true }
    }

    fn commit(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingTransition<'_> {
    fn drop(&mut self) {
        if self.armed {
            let (phase, is_loading) = (self.restore_phase, self.restore_loading);
            self.state.send_modify(|snapshot| {
                snapshot.phase = phase;
                snapshot.is_loading = is_loading;
            });
        }
    }
}

/// Owner of the signed-in player
///
/// Share it with screens through an `Arc`; all methods take `&self`.
///
/// # Example
///
/// ```rust,no_run
/// use app_state::{Router, SessionManager};
/// use arena_client::InMemoryUserDirectory;
/// use std::sync::Arc;
///
/// struct LogRouter;
///
/// impl Router for LogRouter {
///     fn navigate_to_authenticated_area(&self) { println!("-> home"); }
///     fn navigate_to_login(&self) { println!("-> login"); }
/// }
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let manager = SessionManager::new(
///         Arc::new(InMemoryUserDirectory::with_fixture_accounts()),
///         Arc::new(LogRouter),
///     );
///
///     manager.check_existing_session().await;
///     let profile = manager.sign_in("rashid.k@example.com", "validpass").await?;
///     println!("Wallet: {}", profile.wallet_balance);
///     manager.sign_out().await;
///     Ok(())
/// }
/// ```
pub struct SessionManager {
    directory: Arc<dyn UserDirectory>,
    store: Arc<dyn SessionStore>,
    router: Arc<dyn Router>,
    config: SessionConfig,
    state: watch::Sender<SessionSnapshot>,
    /// Serializes check/sign-in/sign-up/sign-out and holds the token of the
    /// current session
    operation: Mutex<Option<SessionToken>>,
}

impl SessionManager {
    /// Create a manager with an in-memory token store and default config
    pub fn new(directory: Arc<dyn UserDirectory>, router: Arc<dyn Router>) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::initializing());
        Self {
            directory,
            store: Arc::new(MemorySessionStore::new()),
            router,
            config: SessionConfig::default(),
            state,
            operation: Mutex::new(None),
        }
    }

    /// Use a different token store
    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = store;
        self
    }

    /// Use a different configuration
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Current configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // =========================================================================
    // Read side
    // =========================================================================

    /// Copy of the current state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    /// Receiver that observes every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    /// The signed-in player, if any
    pub fn profile(&self) -> Option<UserProfile> {
        self.state.borrow().profile.clone()
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase
    }

    /// Whether an operation is outstanding
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    /// Whether a player is signed in
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Resolve the startup state
    ///
    /// Looks for a stored token and asks the directory to resume it. Any
    /// failure is logged and treated as "no session". Only the first call
    /// does work; later calls return the current phase. Never navigates.
    pub async fn check_existing_session(&self) -> SessionPhase {
        let mut turn = self.operation.lock().await;

        let current = self.phase();
        if current != SessionPhase::Initializing {
            tracing::debug!(phase = %current, "session check already resolved");
            return current;
        }

        let pending = PendingTransition::begin(&self.state, SessionPhase::Initializing);

        let restored = match self.restore_session().await {
            Ok(restored) => restored,
            Err(err) => {
                tracing::warn!(error = %err, "continuing signed out");
                None
            }
        };

        pending.commit();
        match restored {
            Some((profile, token)) => {
                *turn = Some(token);
                tracing::info!(user_id = profile.id(), "restored stored session");
                self.publish(SessionPhase::Authenticated, Some(profile));
                SessionPhase::Authenticated
            }
            None => {
                tracing::info!("no stored session");
                self.publish(SessionPhase::Anonymous, None);
                SessionPhase::Anonymous
            }
        }
    }

    /// Sign in with email and password
    ///
    /// On success the player becomes current and the router is asked to
    /// show the signed-in area. On failure nothing changes.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserProfile> {
        let mut turn = self.operation.lock().await;
        let pending = PendingTransition::begin(&self.state, SessionPhase::Authenticating);
        tracing::debug!("signing in");

        let grant = match tokio::time::timeout(
            self.config.request_timeout,
            self.directory.validate_credentials(email, password),
        )
        .await
        {
            Err(_) => {
                tracing::warn!("sign in timed out");
                return Err(SessionError::TimedOut("sign in"));
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "sign in rejected");
                return Err(match err {
                    DirectoryError::InvalidCredentials | DirectoryError::SessionExpired => {
                        SessionError::InvalidCredentials
                    }
                    other => SessionError::Unavailable(other),
                });
            }
            Ok(Ok(grant)) => grant,
        };

        Ok(self.complete_authentication(&mut turn, pending, grant).await)
    }

    /// Create an account from email, password and username and sign in
    pub async fn sign_up(&self, email: &str, password: &str, username: &str) -> Result<UserProfile> {
        self.sign_up_account(NewAccount::new(email, password, username))
            .await
    }

    /// Create an account with every registration detail and sign in
    pub async fn sign_up_account(&self, account: NewAccount) -> Result<UserProfile> {
        let mut turn = self.operation.lock().await;
        let pending = PendingTransition::begin(&self.state, SessionPhase::Authenticating);
        tracing::debug!(username = %account.username, "registering");

        let grant = match tokio::time::timeout(
            self.config.request_timeout,
            self.directory.register(&account),
        )
        .await
        {
            Err(_) => {
                tracing::warn!("registration timed out");
                return Err(SessionError::TimedOut("registration"));
            }
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "registration rejected");
                return Err(match err {
                    err @ (DirectoryError::Network(_) | DirectoryError::Json(_)) => {
                        SessionError::Unavailable(err)
                    }
                    err if err.is_retryable() => SessionError::Unavailable(err),
                    err => SessionError::RegistrationFailed(err.to_string()),
                });
            }
            Ok(Ok(grant)) => grant,
        };

        Ok(self.complete_authentication(&mut turn, pending, grant).await)
    }

    /// Sign out the current player
    ///
    /// Clears the profile, then asks the router for the login screen. The
    /// stored token is forgotten and the directory is told to end the
    /// session; neither failure brings the player back. Does nothing when
    /// nobody is signed in.
    pub async fn sign_out(&self) {
        let mut turn = self.operation.lock().await;

        let user_id = match self.state.borrow().profile.as_ref() {
            Some(profile) => profile.id().to_string(),
            None => {
                tracing::debug!("sign out without a session");
                return;
            }
        };

        let token = turn.take();
        self.publish(SessionPhase::Anonymous, None);
        self.router.navigate_to_login();
        tracing::info!(user_id = %user_id, "signed out");

        self.forget_stored_session().await;

        if let Some(token) = token {
            match tokio::time::timeout(
                self.config.request_timeout,
                self.directory.end_session(&token),
            )
            .await
            {
                Ok(Ok(())) => tracing::debug!(user_id = %user_id, "directory session ended"),
                Ok(Err(err)) => {
                    tracing::warn!(user_id = %user_id, error = %err, "failed to end directory session")
                }
                Err(_) => tracing::warn!(user_id = %user_id, "ending directory session timed out"),
            }
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn publish(&self, phase: SessionPhase, profile: Option<UserProfile>) {
        self.state.send_modify(|snapshot| {
            snapshot.phase = phase;
            snapshot.profile = profile;
            snapshot.is_loading = false;
        });
    }

    /// Navigation first, then state, so nobody sees the player signed in
    /// before the signed-in area has been requested.
    async fn complete_authentication(
        &self,
        current_token: &mut Option<SessionToken>,
        pending: PendingTransition<'_>,
        grant: AuthGrant,
    ) -> UserProfile {
        let AuthGrant { profile, token } = grant;

        pending.commit();
        *current_token = Some(token.clone());
        self.router.navigate_to_authenticated_area();
        self.publish(SessionPhase::Authenticated, Some(profile.clone()));
        tracing::info!(user_id = profile.id(), "signed in");

        if self.config.persist_sessions {
            let stored = StoredSession {
                user_id: profile.id().to_string(),
                token: token.as_str().to_string(),
                expires_at: token.expires_at,
                saved_at: Utc::now(),
            };
            if let Err(err) = self.store.save(&stored).await {
                tracing::warn!(error = %err, "failed to persist session");
            }
        }

        profile
    }

    async fn restore_session(&self) -> Result<Option<(UserProfile, SessionToken)>> {
        if !self.config.restore_sessions {
            return Ok(None);
        }

        let stored = match self.store.load().await {
            Ok(Some(stored)) => stored,
            Ok(None) => return Ok(None),
            Err(err) => {
                self.forget_stored_session().await;
                return Err(SessionError::SessionCheckFailed(err.to_string()));
            }
        };

        if stored.is_expired_at(Utc::now()) {
            tracing::info!(user_id = %stored.user_id, "stored session expired");
            self.forget_stored_session().await;
            return Ok(None);
        }

        let token = SessionToken::new(stored.token, stored.expires_at);
        match tokio::time::timeout(
            self.config.request_timeout,
            self.directory.resume_session(&token),
        )
        .await
        {
            Err(_) => Err(SessionError::SessionCheckFailed("resume timed out".to_string())),
            Ok(Ok(profile)) if profile.id() == stored.user_id => Ok(Some((profile, token))),
            Ok(Ok(_)) => {
                self.forget_stored_session().await;
                Err(SessionError::SessionCheckFailed(
                    "token belongs to a different account".to_string(),
                ))
            }
            Ok(Err(DirectoryError::SessionExpired)) => {
                tracing::info!(user_id = %stored.user_id, "stored session rejected");
                self.forget_stored_session().await;
                Ok(None)
            }
            Ok(Err(err)) => Err(SessionError::SessionCheckFailed(err.to_string())),
        }
    }

    /// Remove the stored token. When the store cannot delete it, the record
    /// is overwritten with one that has already expired, which the startup
    /// check discards without asking the directory.
    async fn forget_stored_session(&self) {
        let err = match self.store.clear().await {
            Ok(()) => return,
            Err(err) => err,
        };
        tracing::warn!(error = %err, "failed to clear stored session, invalidating it");

        let now = Utc::now();
        let invalidated = StoredSession {
            user_id: String::new(),
            token: String::new(),
            expires_at: now,
            saved_at: now,
        };
        if let Err(err) = self.store.save(&invalidated).await {
            tracing::error!(error = %err, "failed to invalidate stored session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::MockRouter;
    use arena_client::fixtures::accounts::{RASHID_EMAIL, RASHID_PASSWORD};
    use arena_client::InMemoryUserDirectory;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::OnceLock;
    use std::time::Duration;

    fn quiet_router() -> MockRouter {
        let mut router = MockRouter::new();
        router.expect_navigate_to_authenticated_area().never();
        router.expect_navigate_to_login().never();
        router
    }

    fn router_expecting(home: usize, login: usize) -> MockRouter {
        let mut router = MockRouter::new();
        router
            .expect_navigate_to_authenticated_area()
            .times(home)
            .return_const(());
        router.expect_navigate_to_login().times(login).return_const(());
        router
    }

    fn manager_with(directory: Arc<InMemoryUserDirectory>, router: MockRouter) -> SessionManager {
        SessionManager::new(directory, Arc::new(router))
    }

    async fn started(directory: Arc<InMemoryUserDirectory>, router: MockRouter) -> SessionManager {
        let manager = manager_with(directory, router);
        manager.check_existing_session().await;
        manager
    }

    fn stored_token(token: &str) -> StoredSession {
        StoredSession {
            user_id: "user123".to_string(),
            token: token.to_string(),
            expires_at: Utc::now() + chrono::Duration::days(1),
            saved_at: Utc::now(),
        }
    }

    /// Store that can save but never delete
    #[derive(Default)]
    struct UndeletableStore {
        inner: MemorySessionStore,
    }

    #[async_trait]
    impl SessionStore for UndeletableStore {
        async fn load(&self) -> storage::session_store::Result<Option<StoredSession>> {
            self.inner.load().await
        }

        async fn save(&self, session: &StoredSession) -> storage::session_store::Result<()> {
            self.inner.save(session).await
        }

        async fn clear(&self) -> storage::session_store::Result<()> {
            Err(storage::StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only volume",
            )))
        }
    }

    /// Fixture directory whose logout endpoint is down
    struct KeepsSessionsDirectory {
        inner: InMemoryUserDirectory,
    }

    #[async_trait]
    impl UserDirectory for KeepsSessionsDirectory {
        async fn validate_credentials(
            &self,
            email: &str,
            password: &str,
        ) -> arena_client::directory::Result<AuthGrant> {
            self.inner.validate_credentials(email, password).await
        }

        async fn register(&self, account: &NewAccount) -> arena_client::directory::Result<AuthGrant> {
            self.inner.register(account).await
        }

        async fn resume_session(
            &self,
            token: &SessionToken,
        ) -> arena_client::directory::Result<UserProfile> {
            self.inner.resume_session(token).await
        }

        async fn end_session(&self, _: &SessionToken) -> arena_client::directory::Result<()> {
            Err(DirectoryError::Api { status: 503, message: "maintenance".to_string() })
        }
    }

    /// Directory that cannot be reached
    struct UnreachableDirectory {
        resume_calls: AtomicUsize,
    }

    #[async_trait]
    impl UserDirectory for UnreachableDirectory {
        async fn validate_credentials(&self, _: &str, _: &str) -> arena_client::directory::Result<AuthGrant> {
            Err(DirectoryError::Network("connection refused".to_string()))
        }

        async fn register(&self, _: &NewAccount) -> arena_client::directory::Result<AuthGrant> {
            Err(DirectoryError::Network("connection refused".to_string()))
        }

        async fn resume_session(&self, _: &SessionToken) -> arena_client::directory::Result<UserProfile> {
            self.resume_calls.fetch_add(1, Ordering::SeqCst);
            Err(DirectoryError::Network("connection refused".to_string()))
        }

        async fn end_session(&self, _: &SessionToken) -> arena_client::directory::Result<()> {
            Err(DirectoryError::Network("connection refused".to_string()))
        }
    }

    #[test]
    fn test_initial_state() {
        let manager = manager_with(Arc::new(InMemoryUserDirectory::new()), quiet_router());
        let snapshot = manager.snapshot();

        assert_eq!(snapshot.phase(), SessionPhase::Initializing);
        assert!(snapshot.is_loading());
        assert!(!snapshot.is_authenticated());
        assert!(snapshot.profile().is_none());
    }

    #[tokio::test]
    async fn test_startup_without_stored_session() {
        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let manager = manager_with(directory.clone(), quiet_router());

        let phase = manager.check_existing_session().await;

        assert_eq!(phase, SessionPhase::Anonymous);
        assert!(!manager.is_loading());
        assert!(manager.profile().is_none());
        assert_eq!(directory.calls().total(), 0);
    }

    #[tokio::test]
    async fn test_session_check_runs_once() {
        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let manager = started(directory.clone(), router_expecting(1, 0)).await;

        manager.sign_in(RASHID_EMAIL, RASHID_PASSWORD).await.unwrap();

        // A late check must not reset an established session
        assert_eq!(manager.check_existing_session().await, SessionPhase::Authenticated);
        assert!(manager.is_authenticated());
        assert_eq!(directory.calls().resume, 0);
    }

    #[tokio::test]
    async fn test_sign_in_success() {
        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let manager = started(directory, router_expecting(1, 0)).await;

        let profile = manager.sign_in(RASHID_EMAIL, RASHID_PASSWORD).await.unwrap();

        assert_eq!(profile.username, "rashid89");
        assert_eq!(profile.wallet_balance, 2500);

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase(), SessionPhase::Authenticated);
        assert!(snapshot.is_authenticated());
        assert!(!snapshot.is_loading());
        assert_eq!(snapshot.profile(), Some(&profile));
    }

    #[tokio::test]
    async fn test_sign_in_invalid_credentials() {
        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let manager = started(directory, quiet_router()).await;

        let result = manager.sign_in(RASHID_EMAIL, "wrongpass").await;

        assert!(matches!(result, Err(SessionError::InvalidCredentials)));
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase(), SessionPhase::Anonymous);
        assert!(!snapshot.is_authenticated());
        assert!(!snapshot.is_loading());
    }

    #[tokio::test]
    async fn test_failed_sign_in_keeps_existing_profile() {
        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let manager = started(directory, router_expecting(1, 0)).await;

        let profile = manager.sign_in(RASHID_EMAIL, RASHID_PASSWORD).await.unwrap();
        let result = manager.sign_in("someone@example.com", "wrongpass").await;

        assert!(matches!(result, Err(SessionError::InvalidCredentials)));
        assert_eq!(manager.phase(), SessionPhase::Authenticated);
        assert_eq!(manager.profile(), Some(profile));
    }

    #[tokio::test]
    async fn test_sign_up_builds_profile_from_inputs() {
        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let manager = started(directory, router_expecting(1, 0)).await;

        let profile = manager
            .sign_up("new@example.com", "pw123456", "newuser")
            .await
            .unwrap();

        assert_eq!(profile.email, "new@example.com");
        assert_eq!(profile.username, "newuser");
        assert_eq!(profile.state, "Maharashtra");
        assert!(manager.is_authenticated());
    }

    #[tokio::test]
    async fn test_sign_up_duplicate_email() {
        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let manager = started(directory, quiet_router()).await;

        let result = manager.sign_up(RASHID_EMAIL, "pw123456", "rashid").await;

        assert!(matches!(result, Err(SessionError::RegistrationFailed(_))));
        assert_eq!(manager.phase(), SessionPhase::Anonymous);
        assert!(!manager.is_loading());
    }

    #[tokio::test]
    async fn test_sign_out_after_sign_in() {
        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let manager = started(directory, router_expecting(1, 1)).await;

        manager.sign_in(RASHID_EMAIL, RASHID_PASSWORD).await.unwrap();
        manager.sign_out().await;

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase(), SessionPhase::Anonymous);
        assert!(snapshot.profile().is_none());
        assert!(!snapshot.is_authenticated());
    }

    #[tokio::test]
    async fn test_sign_out_when_anonymous_is_noop() {
        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let manager = started(directory, quiet_router()).await;

        let before = manager.snapshot();
        manager.sign_out().await;
        manager.sign_out().await;

        assert_eq!(manager.snapshot(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loading_while_authenticating() {
        let directory = Arc::new(
            InMemoryUserDirectory::with_fixture_accounts().with_latency(Duration::from_secs(1)),
        );
        let manager = Arc::new(started(directory, router_expecting(1, 0)).await);

        let task = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.sign_in(RASHID_EMAIL, RASHID_PASSWORD).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase(), SessionPhase::Authenticating);
        assert!(snapshot.is_loading());
        assert!(!snapshot.is_authenticated());

        task.await.unwrap().unwrap();
        assert!(!manager.is_loading());
        assert!(manager.is_authenticated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_restores_state() {
        let directory = Arc::new(
            InMemoryUserDirectory::with_fixture_accounts().with_latency(Duration::from_secs(10)),
        );
        let manager = manager_with(directory, quiet_router())
            .with_config(SessionConfig::new().request_timeout(Duration::from_secs(1)));
        manager.check_existing_session().await;

        let result = manager.sign_in(RASHID_EMAIL, RASHID_PASSWORD).await;

        assert!(matches!(result, Err(SessionError::TimedOut(_))));
        assert_eq!(manager.phase(), SessionPhase::Anonymous);
        assert!(!manager.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_sign_in_discards_result() {
        let directory = Arc::new(
            InMemoryUserDirectory::with_fixture_accounts().with_latency(Duration::from_secs(1)),
        );
        let manager = started(directory, quiet_router()).await;

        // The caller goes away before the directory answers
        let outcome = tokio::time::timeout(
            Duration::from_millis(100),
            manager.sign_in(RASHID_EMAIL, RASHID_PASSWORD),
        )
        .await;

        assert!(outcome.is_err());
        let snapshot = manager.snapshot();
        assert_eq!(snapshot.phase(), SessionPhase::Anonymous);
        assert!(!snapshot.is_loading());
        assert!(snapshot.profile().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_calls_are_serialized() {
        let directory = Arc::new(
            InMemoryUserDirectory::with_fixture_accounts().with_latency(Duration::from_millis(500)),
        );
        let manager = started(directory, router_expecting(1, 1)).await;

        let (signed_in, ()) = tokio::join!(
            manager.sign_in(RASHID_EMAIL, RASHID_PASSWORD),
            manager.sign_out(),
        );

        // sign_in was issued first, sign_out ran after it and wins
        assert!(signed_in.is_ok());
        assert_eq!(manager.phase(), SessionPhase::Anonymous);
        assert!(manager.profile().is_none());
    }

    #[tokio::test]
    async fn test_navigation_precedes_authenticated_state() {
        let receiver: Arc<OnceLock<watch::Receiver<SessionSnapshot>>> = Arc::new(OnceLock::new());
        let authenticated_at_navigation = Arc::new(AtomicUsize::new(0));
        let profile_at_login = Arc::new(AtomicUsize::new(0));

        let mut router = MockRouter::new();
        {
            let receiver = receiver.clone();
            let seen = authenticated_at_navigation.clone();
            router
                .expect_navigate_to_authenticated_area()
                .times(1)
                .returning(move || {
                    if let Some(rx) = receiver.get() {
                        if rx.borrow().is_authenticated() {
                            seen.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
        }
        {
            let receiver = receiver.clone();
            let seen = profile_at_login.clone();
            router.expect_navigate_to_login().times(1).returning(move || {
                if let Some(rx) = receiver.get() {
                    if rx.borrow().profile().is_some() {
                        seen.fetch_add(1, Ordering::SeqCst);
                    }
                }
            });
        }

        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let manager = manager_with(directory, router);
        receiver.set(manager.subscribe()).unwrap();
        manager.check_existing_session().await;

        manager.sign_in(RASHID_EMAIL, RASHID_PASSWORD).await.unwrap();
        manager.sign_out().await;

        // Not yet authenticated when home was requested; already cleared at login
        assert_eq!(authenticated_at_navigation.load(Ordering::SeqCst), 0);
        assert_eq!(profile_at_login.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let manager = manager_with(directory, router_expecting(1, 0));
        let mut receiver = manager.subscribe();

        manager.check_existing_session().await;
        assert!(receiver.has_changed().unwrap());
        assert_eq!(receiver.borrow_and_update().phase(), SessionPhase::Anonymous);

        manager.sign_in(RASHID_EMAIL, RASHID_PASSWORD).await.unwrap();
        assert!(receiver.has_changed().unwrap());
        assert!(receiver.borrow_and_update().is_authenticated());
    }

    #[tokio::test]
    async fn test_restore_from_stored_token() {
        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let store: Arc<MemorySessionStore> = Arc::new(MemorySessionStore::new());

        let first = manager_with(directory.clone(), router_expecting(1, 0)).with_store(store.clone());
        first.check_existing_session().await;
        let profile = first.sign_in(RASHID_EMAIL, RASHID_PASSWORD).await.unwrap();
        drop(first);

        // Next launch
        let second = manager_with(directory.clone(), quiet_router()).with_store(store);
        let phase = second.check_existing_session().await;

        assert_eq!(phase, SessionPhase::Authenticated);
        assert!(!second.is_loading());
        assert_eq!(second.profile().map(|p| p.id().to_string()), Some(profile.id().to_string()));
        assert_eq!(directory.calls().resume, 1);
    }

    #[tokio::test]
    async fn test_revoked_token_falls_back_to_anonymous() {
        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let store: Arc<MemorySessionStore> = Arc::new(MemorySessionStore::new());

        let first = manager_with(directory.clone(), router_expecting(1, 0)).with_store(store.clone());
        first.check_existing_session().await;
        first.sign_in(RASHID_EMAIL, RASHID_PASSWORD).await.unwrap();

        directory.revoke_all_sessions();

        let second = manager_with(directory, quiet_router()).with_store(store.clone());
        assert_eq!(second.check_existing_session().await, SessionPhase::Anonymous);
        assert!(!second.is_loading());
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_stored_session_is_not_sent_to_directory() {
        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let store = Arc::new(MemorySessionStore::with_session(StoredSession {
            user_id: "user123".to_string(),
            token: "stale".to_string(),
            expires_at: Utc::now() - chrono::Duration::hours(1),
            saved_at: Utc::now() - chrono::Duration::days(31),
        }));

        let manager = manager_with(directory.clone(), quiet_router()).with_store(store.clone());

        assert_eq!(manager.check_existing_session().await, SessionPhase::Anonymous);
        assert_eq!(directory.calls().resume, 0);
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_forgets_stored_token() {
        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let store: Arc<MemorySessionStore> = Arc::new(MemorySessionStore::new());
        let manager = manager_with(directory, router_expecting(1, 1)).with_store(store.clone());
        manager.check_existing_session().await;

        manager.sign_in(RASHID_EMAIL, RASHID_PASSWORD).await.unwrap();
        assert!(store.load().await.unwrap().is_some());

        manager.sign_out().await;
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_ends_directory_session() {
        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let manager = started(directory.clone(), router_expecting(1, 1)).await;

        manager.sign_in(RASHID_EMAIL, RASHID_PASSWORD).await.unwrap();
        assert_eq!(directory.session_count(), 1);

        manager.sign_out().await;
        assert_eq!(directory.session_count(), 0);
        assert_eq!(directory.calls().end, 1);
    }

    #[tokio::test]
    async fn test_sign_out_ends_restored_session() {
        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let store = Arc::new(MemorySessionStore::with_session(stored_token("tok_restored")));
        assert!(directory.adopt_session("user123", "tok_restored", Utc::now() + chrono::Duration::days(1)));

        let manager = manager_with(directory.clone(), router_expecting(0, 1)).with_store(store);
        assert_eq!(manager.check_existing_session().await, SessionPhase::Authenticated);

        manager.sign_out().await;
        assert_eq!(directory.session_count(), 0);
    }

    #[tokio::test]
    async fn test_sign_out_invalidates_undeletable_token() {
        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let store = Arc::new(UndeletableStore::default());

        let first = manager_with(directory.clone(), router_expecting(1, 1)).with_store(store.clone());
        first.check_existing_session().await;
        first.sign_in(RASHID_EMAIL, RASHID_PASSWORD).await.unwrap();
        first.sign_out().await;
        drop(first);

        let left = store.load().await.unwrap().unwrap();
        assert!(left.is_expired_at(Utc::now()));
        assert!(left.token.is_empty());

        // Next launch stays signed out without asking the directory
        let second = manager_with(directory.clone(), quiet_router()).with_store(store);
        assert_eq!(second.check_existing_session().await, SessionPhase::Anonymous);
        assert!(second.profile().is_none());
        assert_eq!(directory.calls().resume, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resume_timeout_keeps_stored_token() {
        let directory = Arc::new(
            InMemoryUserDirectory::with_fixture_accounts().with_latency(Duration::from_secs(60)),
        );
        let stored = stored_token("tok_slow");
        assert!(directory.adopt_session("user123", "tok_slow", stored.expires_at));
        let store = Arc::new(MemorySessionStore::with_session(stored.clone()));

        let manager = manager_with(directory.clone(), quiet_router())
            .with_store(store.clone())
            .with_config(SessionConfig::new().request_timeout(Duration::from_secs(1)));

        assert_eq!(manager.check_existing_session().await, SessionPhase::Anonymous);
        assert!(!manager.is_loading());
        assert!(manager.profile().is_none());
        assert_eq!(directory.calls().resume, 1);
        assert_eq!(store.load().await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn test_unreachable_directory_keeps_stored_token() {
        let directory = Arc::new(UnreachableDirectory { resume_calls: AtomicUsize::new(0) });
        let stored = stored_token("tok_offline");
        let store = Arc::new(MemorySessionStore::with_session(stored.clone()));

        let manager = SessionManager::new(directory.clone(), Arc::new(quiet_router()))
            .with_store(store.clone());

        assert_eq!(manager.check_existing_session().await, SessionPhase::Anonymous);
        assert!(!manager.is_loading());
        assert!(!manager.is_authenticated());
        assert_eq!(directory.resume_calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.load().await.unwrap(), Some(stored));
    }

    #[tokio::test]
    async fn test_sign_out_when_directory_cannot_end_session() {
        let directory = Arc::new(KeepsSessionsDirectory {
            inner: InMemoryUserDirectory::with_fixture_accounts(),
        });
        let store: Arc<MemorySessionStore> = Arc::new(MemorySessionStore::new());
        let manager = SessionManager::new(directory.clone(), Arc::new(router_expecting(1, 1)))
            .with_store(store.clone());
        manager.check_existing_session().await;

        manager.sign_in(RASHID_EMAIL, RASHID_PASSWORD).await.unwrap();
        manager.sign_out().await;

        assert_eq!(manager.phase(), SessionPhase::Anonymous);
        assert!(manager.profile().is_none());
        assert!(store.load().await.unwrap().is_none());
        assert_eq!(directory.inner.session_count(), 1);
    }

    #[tokio::test]
    async fn test_persistence_can_be_disabled() {
        let directory = Arc::new(InMemoryUserDirectory::with_fixture_accounts());
        let store: Arc<MemorySessionStore> = Arc::new(MemorySessionStore::new());
        let manager = manager_with(directory, router_expecting(1, 0))
            .with_store(store.clone())
            .with_config(SessionConfig::new().persist_sessions(false));
        manager.check_existing_session().await;

        manager.sign_in(RASHID_EMAIL, RASHID_PASSWORD).await.unwrap();
        assert!(store.load().await.unwrap().is_none());
    }
}
