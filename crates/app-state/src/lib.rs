//! Application state management for Arena Play
//!
//! This crate owns the signed-in player. [`session::SessionManager`] is the
//! single writer of session state; screens hold snapshot receivers and call
//! its operations. Navigation is requested through the [`router::Router`]
//! capability so the state machine stays independent of any UI toolkit.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod router;
pub mod session;

pub use config::SessionConfig;
pub use router::Router;
pub use session::{SessionError, SessionManager, SessionPhase, SessionSnapshot};
