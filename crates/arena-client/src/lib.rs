//! Account directory client for Arena Play
//!
//! This crate provides the account and catalog types shared by every layer
//! of the app, the [`UserDirectory`] capability that validates credentials
//! and creates accounts, and two implementations of it: an HTTP client for
//! the real backend and an in-memory directory backed by fixture accounts.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod catalog;
pub mod directory;
pub mod fixtures;
pub mod http;
pub mod profile;

pub use catalog::{
    Game, GameStatus, GameType, Notification, NotificationType, Tournament, TournamentStatus,
    Transaction, TransactionStatus, TransactionType,
};
pub use directory::{DirectoryError, UserDirectory};
pub use fixtures::InMemoryUserDirectory;
pub use http::{HttpDirectoryConfig, HttpUserDirectory};
pub use profile::{AuthGrant, NewAccount, SessionToken, UserProfile};
