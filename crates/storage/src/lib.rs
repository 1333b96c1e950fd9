//! Storage layer for Arena Play
//!
//! This crate persists the session token between app launches so the
//! startup check can restore a signed-in player.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod session_store;

pub use session_store::{
    FileSessionStore, MemorySessionStore, SessionStore, StoreConfig, StoreError, StoredSession,
};
