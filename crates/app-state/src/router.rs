//! Navigation capability used by the session manager

/// Moves the UI between the signed-out and signed-in areas
///
/// Calls are fire-and-forget: the session manager never waits for a
/// transition to finish and does not care whether it was animated.
#[cfg_attr(test, mockall::automock)]
pub trait Router: Send + Sync {
    /// Show the signed-in area (home tab)
    fn navigate_to_authenticated_area(&self);

    /// Show the login screen
    fn navigate_to_login(&self);
}
