//! Arena Play session core
//!
//! Wires the user directory, the session token store, the session manager
//! and the navigation router into one [`App`].

use app_core::AuthService;
use app_state::{SessionConfig, SessionManager};
use app_ui::NavigationRouter;
use arena_client::UserDirectory;
use std::sync::Arc;
use storage::SessionStore;

pub use app_core;
pub use app_state;
pub use app_ui;
pub use arena_client;
pub use storage;

/// Install the global `tracing` subscriber
///
/// Filtering follows `RUST_LOG` and defaults to `info`. Calling it more
/// than once is harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .try_init();
}

/// The running application
#[derive(Clone)]
pub struct App {
    /// Owner of the signed-in player
    pub session: Arc<SessionManager>,
    /// Form submission for the auth screens
    pub auth: AuthService,
    /// Navigation state driven by the session manager
    pub router: Arc<NavigationRouter>,
}

impl App {
    /// Build the application around a directory and a token store
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        store: Arc<dyn SessionStore>,
        config: SessionConfig,
    ) -> Self {
        let router = Arc::new(NavigationRouter::new());
        let session = Arc::new(
            SessionManager::new(directory, router.clone())
                .with_store(store)
                .with_config(config),
        );

        Self { auth: AuthService::new(session.clone()), session, router }
    }

    /// Resolve the startup session and show the matching area
    ///
    /// The session manager never navigates during this check, so the
    /// launch redirect is applied here.
    pub async fn start(&self) -> app_ui::Route {
        use app_state::Router as _;

        self.session.check_existing_session().await;
        if app_ui::entry_route(&self.session.snapshot()) == Some(app_ui::Route::Home) {
            self.router.navigate_to_authenticated_area();
        }
        self.router.current_route()
    }
}
