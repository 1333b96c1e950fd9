//! User interface layer for Arena Play
//!
//! Toolkit-independent pieces of the UI: routes and navigation state, the
//! [`navigation::NavigationRouter`] handed to the session manager, and the
//! screen models views bind to.
//!
//! # Modules
//!
//! - [`navigation`] - Routes, tabs, stacks and the router
//! - [`screens`] - Login, registration, home feed and wallet models
//!
//! # Example
//!
//! ```rust
//! use app_ui::navigation::{NavigationRouter, Route};
//! use app_state::Router;
//!
//! let router = NavigationRouter::new();
//! assert_eq!(router.current_route(), Route::Login);
//!
//! router.navigate_to_authenticated_area();
//! assert_eq!(router.current_route(), Route::Home);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod navigation;
pub mod screens;

pub use navigation::{
    entry_route, Area, NavigationRouter, NavigationStack, NavigationState, NavigationTab, Route,
    StackEntry, Transition,
};
pub use screens::{
    format_rupees, format_signed_amount, HomeFeed, HomeScreen, LoginScreen, RegisterScreen,
    RegisterStep, TransactionFilter, TransactionRow, WalletScreen,
};
