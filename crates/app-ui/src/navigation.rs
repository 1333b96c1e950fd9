//! Navigation system for Arena Play
//!
//! This module provides:
//! - Route definitions for the signed-out and signed-in areas
//! - Tab navigation with one stack per tab
//! - [`NavigationRouter`], the [`app_state::Router`] used by the session manager
//! - [`entry_route`], the redirect shown at launch

use app_state::SessionSnapshot;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// =============================================================================
// Route Definitions
// =============================================================================

/// All possible routes in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    // Signed-out area
    /// Email and password sign-in
    #[default]
    Login,
    /// Two-step account creation
    Register,

    // Signed-in area (tabs)
    /// Home tab
    Home,
    /// Games tab
    Games,
    /// Tournaments tab
    Tournaments,
    /// Wallet tab
    Wallet,
    /// Profile tab
    Profile,
}

impl Route {
    /// Convert route to URL path
    pub fn to_path(&self) -> &'static str {
        match self {
            Route::Login => "/auth/login",
            Route::Register => "/auth/register",
            Route::Home => "/",
            Route::Games => "/games",
            Route::Tournaments => "/tournaments",
            Route::Wallet => "/wallet",
            Route::Profile => "/profile",
        }
    }

    /// Parse a URL path, ignoring any query string and trailing slash
    pub fn from_path(path: &str) -> Option<Route> {
        let pathname = path.split('?').next().unwrap_or_default();
        let trimmed = pathname.trim_end_matches('/');
        let route = match trimmed {
            "" | "/(tabs)" => Route::Home,
            "/auth/login" => Route::Login,
            "/auth/register" => Route::Register,
            "/games" => Route::Games,
            "/tournaments" => Route::Tournaments,
            "/wallet" => Route::Wallet,
            "/profile" => Route::Profile,
            _ => return None,
        };
        Some(route)
    }

    /// Check if route requires a signed-in player
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Login | Route::Register)
    }

    /// Get the title for this route
    pub fn title(&self) -> &'static str {
        match self {
            Route::Login => "Sign In",
            Route::Register => "Create Account",
            Route::Home => "Home",
            Route::Games => "Games",
            Route::Tournaments => "Tournaments",
            Route::Wallet => "Wallet",
            Route::Profile => "Profile",
        }
    }

    /// Tab this route is the root of, if any
    pub fn tab(&self) -> Option<NavigationTab> {
        NavigationTab::all()
            .into_iter()
            .find(|tab| tab.root_route() == *self)
    }
}

/// Where the launch screen should redirect to
///
/// `None` while the session is still loading: nothing is shown yet.
pub fn entry_route(snapshot: &SessionSnapshot) -> Option<Route> {
    if snapshot.is_loading() {
        None
    } else if snapshot.is_authenticated() {
        Some(Route::Home)
    } else {
        Some(Route::Login)
    }
}

// =============================================================================
// Navigation Tabs
// =============================================================================

/// Main navigation tabs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NavigationTab {
    /// Home tab
    #[default]
    Home,
    /// Games tab
    Games,
    /// Tournaments tab
    Tournaments,
    /// Wallet tab
    Wallet,
    /// Profile tab
    Profile,
}

impl NavigationTab {
    /// Get the root route for this tab
    pub fn root_route(&self) -> Route {
        match self {
            NavigationTab::Home => Route::Home,
            NavigationTab::Games => Route::Games,
            NavigationTab::Tournaments => Route::Tournaments,
            NavigationTab::Wallet => Route::Wallet,
            NavigationTab::Profile => Route::Profile,
        }
    }

    /// Get all tabs in order
    pub fn all() -> [NavigationTab; 5] {
        [
            NavigationTab::Home,
            NavigationTab::Games,
            NavigationTab::Tournaments,
            NavigationTab::Wallet,
            NavigationTab::Profile,
        ]
    }
}

// =============================================================================
// Navigation Stack
// =============================================================================

/// A navigation stack entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackEntry {
    /// The route
    pub route: Route,
    /// Unique key for this entry
    pub key: String,
}

impl StackEntry {
    /// Create a new stack entry
    pub fn new(route: Route) -> Self {
        Self { route, key: uuid::Uuid::new_v4().to_string() }
    }
}

/// Stack of routes; never empty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationStack {
    /// Stack entries (bottom to top)
    entries: Vec<StackEntry>,
}

impl NavigationStack {
    /// Create a new navigation stack with a root route
    pub fn new(root: Route) -> Self {
        Self { entries: vec![StackEntry::new(root)] }
    }

    /// Push a route onto the stack
    pub fn push(&mut self, route: Route) {
        self.entries.push(StackEntry::new(route));
    }

    /// Pop the top route (returns true if popped, false if at root)
    pub fn pop(&mut self) -> bool {
        if self.entries.len() > 1 {
            self.entries.pop();
            true
        } else {
            false
        }
    }

    /// Replace the top route
    pub fn replace(&mut self, route: Route) {
        if let Some(last) = self.entries.last_mut() {
            *last = StackEntry::new(route);
        }
    }

    /// Get the current (top) route
    pub fn current(&self) -> Route {
        self.entries
            .last()
            .map(|entry| entry.route)
            .unwrap_or_default()
    }

    /// Check if we can go back
    pub fn can_go_back(&self) -> bool {
        self.entries.len() > 1
    }

    /// Get stack depth
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Reset to a new root
    pub fn reset(&mut self, route: Route) {
        self.entries = vec![StackEntry::new(route)];
    }
}

// =============================================================================
// Navigation State
// =============================================================================

/// Which half of the app is on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Area {
    /// Login and registration
    SignedOut,
    /// The tab bar
    SignedIn,
}

/// Complete navigation state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationState {
    /// Area on screen
    pub area: Area,
    /// Login/registration stack
    pub auth_stack: NavigationStack,
    /// Current active tab
    pub active_tab: NavigationTab,
    /// Stacks for each tab
    pub tab_stacks: HashMap<NavigationTab, NavigationStack>,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            area: Area::SignedOut,
            auth_stack: NavigationStack::new(Route::Login),
            active_tab: NavigationTab::default(),
            tab_stacks: Self::fresh_tab_stacks(),
        }
    }
}

impl NavigationState {
    /// Create a new navigation state showing the login screen
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_tab_stacks() -> HashMap<NavigationTab, NavigationStack> {
        NavigationTab::all()
            .into_iter()
            .map(|tab| (tab, NavigationStack::new(tab.root_route())))
            .collect()
    }

    fn current_stack(&self) -> Option<&NavigationStack> {
        match self.area {
            Area::SignedOut => Some(&self.auth_stack),
            Area::SignedIn => self.tab_stacks.get(&self.active_tab),
        }
    }

    fn current_stack_mut(&mut self) -> &mut NavigationStack {
        match self.area {
            Area::SignedOut => &mut self.auth_stack,
            Area::SignedIn => {
                let tab = self.active_tab;
                self.tab_stacks
                    .entry(tab)
                    .or_insert_with(|| NavigationStack::new(tab.root_route()))
            }
        }
    }

    /// Get the current route
    pub fn current_route(&self) -> Route {
        self.current_stack()
            .map(NavigationStack::current)
            .unwrap_or_else(|| self.active_tab.root_route())
    }

    /// Push a route in the current area
    ///
    /// A tab root switches tabs instead. Routes from the other area are
    /// ignored: crossing areas only happens through sign-in and sign-out.
    pub fn navigate(&mut self, route: Route) -> bool {
        let signed_in = self.area == Area::SignedIn;
        if route.requires_auth() != signed_in {
            return false;
        }
        match route.tab() {
            Some(tab) if signed_in => self.switch_tab(tab),
            _ => self.current_stack_mut().push(route),
        }
        true
    }

    /// Swap the top of the current stack for `route`
    ///
    /// Same area rules as [`NavigationState::navigate`]; the stack does not
    /// grow, so going back skips the replaced screen.
    pub fn replace(&mut self, route: Route) -> bool {
        let signed_in = self.area == Area::SignedIn;
        if route.requires_auth() != signed_in {
            return false;
        }
        match route.tab() {
            Some(tab) if signed_in => self.switch_tab(tab),
            _ => self.current_stack_mut().replace(route),
        }
        true
    }

    /// Go back in the current stack
    pub fn go_back(&mut self) -> bool {
        self.current_stack_mut().pop()
    }

    /// Switch to a different tab
    pub fn switch_tab(&mut self, tab: NavigationTab) {
        self.active_tab = tab;
    }

    /// Replace everything with the home tab
    pub fn show_authenticated_area(&mut self) {
        self.area = Area::SignedIn;
        self.active_tab = NavigationTab::Home;
        self.tab_stacks = Self::fresh_tab_stacks();
    }

    /// Replace everything with the login screen
    pub fn show_login(&mut self) {
        self.area = Area::SignedOut;
        self.auth_stack.reset(Route::Login);
    }

    /// Check if we can go back
    pub fn can_go_back(&self) -> bool {
        self.current_stack().is_some_and(NavigationStack::can_go_back)
    }
}

// =============================================================================
// Router
// =============================================================================

/// A completed area change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Transition {
    /// Route on screen before
    pub from: Route,
    /// Route on screen after
    pub to: Route,
}

/// Router backed by [`NavigationState`]
///
/// Area changes replace the whole history, so the back gesture cannot
/// return to the login screen after signing in (or to a tab after signing
/// out). Every change is recorded in [`NavigationRouter::transitions`].
#[derive(Debug, Default)]
pub struct NavigationRouter {
    state: Mutex<NavigationState>,
    transitions: Mutex<Vec<Transition>>,
}

impl NavigationRouter {
    /// Create a router showing the login screen
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current route
    pub fn current_route(&self) -> Route {
        self.state.lock().current_route()
    }

    /// Copy of the navigation state
    pub fn state(&self) -> NavigationState {
        self.state.lock().clone()
    }

    /// Push a route within the current area
    pub fn navigate(&self, route: Route) -> bool {
        self.state.lock().navigate(route)
    }

    /// Replace the current route within the current area
    pub fn replace(&self, route: Route) -> bool {
        self.state.lock().replace(route)
    }

    /// Go back within the current area
    pub fn go_back(&self) -> bool {
        self.state.lock().go_back()
    }

    /// Area changes so far, oldest first
    pub fn transitions(&self) -> Vec<Transition> {
        self.transitions.lock().clone()
    }

    fn change_area(&self, apply: impl FnOnce(&mut NavigationState)) {
        let transition = {
            let mut state = self.state.lock();
            let from = state.current_route();
            apply(&mut state);
            Transition { from, to: state.current_route() }
        };
        tracing::debug!(from = ?transition.from, to = ?transition.to, "navigation");
        self.transitions.lock().push(transition);
    }
}

impl app_state::Router for NavigationRouter {
    fn navigate_to_authenticated_area(&self) {
        self.change_area(NavigationState::show_authenticated_area);
    }

    fn navigate_to_login(&self) {
        self.change_area(NavigationState::show_login);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use app_state::Router as _;

    #[test]
    fn test_route_to_path() {
        assert_eq!(Route::Home.to_path(), "/");
        assert_eq!(Route::Login.to_path(), "/auth/login");
        assert_eq!(Route::Wallet.to_path(), "/wallet");
    }

    #[test]
    fn test_route_from_path() {
        assert_eq!(Route::from_path("/"), Some(Route::Home));
        assert_eq!(Route::from_path("/auth/register/"), Some(Route::Register));
        assert_eq!(Route::from_path("/wallet?tab=history"), Some(Route::Wallet));
        assert_eq!(Route::from_path("/nonexistent/path"), None);

        for tab in NavigationTab::all() {
            let route = tab.root_route();
            assert_eq!(Route::from_path(route.to_path()), Some(route));
        }
    }

    #[test]
    fn test_route_requires_auth() {
        assert!(!Route::Login.requires_auth());
        assert!(!Route::Register.requires_auth());
        assert!(Route::Home.requires_auth());
        assert!(Route::Wallet.requires_auth());
    }

    #[test]
    fn test_navigation_stack_push_pop() {
        let mut stack = NavigationStack::new(Route::Login);
        assert_eq!(stack.depth(), 1);
        assert!(!stack.can_go_back());

        stack.push(Route::Register);
        assert_eq!(stack.current(), Route::Register);
        assert!(stack.can_go_back());

        assert!(stack.pop());
        assert_eq!(stack.current(), Route::Login);

        // Can't pop past root
        assert!(!stack.pop());
    }

    #[test]
    fn test_replace_keeps_depth() {
        let mut state = NavigationState::new();
        assert!(state.navigate(Route::Register));

        assert!(state.replace(Route::Login));
        assert_eq!(state.current_route(), Route::Login);
        assert!(state.can_go_back());
        assert!(state.go_back());
        assert_eq!(state.current_route(), Route::Login);
        assert!(!state.can_go_back());

        // Tab roots are still reached by switching tabs
        assert!(!state.replace(Route::Wallet));
        state.show_authenticated_area();
        assert!(state.replace(Route::Wallet));
        assert_eq!(state.active_tab, NavigationTab::Wallet);
    }

    #[test]
    fn test_state_keeps_areas_apart() {
        let mut state = NavigationState::new();
        assert_eq!(state.current_route(), Route::Login);

        assert!(!state.navigate(Route::Wallet));
        assert!(state.navigate(Route::Register));
        assert_eq!(state.current_route(), Route::Register);

        state.show_authenticated_area();
        assert_eq!(state.current_route(), Route::Home);
        assert!(!state.navigate(Route::Login));

        assert!(state.navigate(Route::Wallet));
        assert_eq!(state.active_tab, NavigationTab::Wallet);
        assert_eq!(state.current_route(), Route::Wallet);
    }

    #[test]
    fn test_router_replaces_history() {
        let router = NavigationRouter::new();
        router.navigate(Route::Register);

        router.navigate_to_authenticated_area();
        assert_eq!(router.current_route(), Route::Home);
        assert!(!router.go_back());

        router.navigate(Route::Wallet);
        router.navigate_to_login();
        assert_eq!(router.current_route(), Route::Login);
        assert!(!router.state().can_go_back());

        assert_eq!(
            router.transitions(),
            vec![
                Transition { from: Route::Register, to: Route::Home },
                Transition { from: Route::Wallet, to: Route::Login },
            ]
        );
    }

    #[test]
    fn test_navigation_state_serialization() {
        let mut state = NavigationState::new();
        state.show_authenticated_area();

        let json = serde_json::to_string(&state).unwrap();
        let parsed: NavigationState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.area, Area::SignedIn);
        assert_eq!(parsed.current_route(), Route::Home);
    }
}
