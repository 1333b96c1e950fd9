//! Persisted session token
//!
//! A signed-in player's token is written to a small JSON envelope carrying a
//! schema version and an md5 checksum of the payload. Writes go through a
//! temp file and a rename so a crash mid-write leaves the previous file
//! intact. A file that fails its checksum or carries another schema version
//! is reported as an error; callers decide whether to discard it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

/// Session store error types
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Checksum did not match the payload
    #[error("Corruption detected: {0}")]
    Corruption(String),

    /// File was written by another schema version
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch {
        /// Expected version
        expected: u32,
        /// Found version
        found: u32,
    },
}

/// Result type for session store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// The record kept between launches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    /// Identifier of the signed-in player
    pub user_id: String,
    /// Bearer token issued by the directory
    pub token: String,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
    /// When this record was written
    pub saved_at: DateTime<Utc>,
}

impl StoredSession {
    /// Whether the token has expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Where the current session token lives between launches
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read the stored session, if any
    async fn load(&self) -> Result<Option<StoredSession>>;

    /// Replace the stored session
    async fn save(&self, session: &StoredSession) -> Result<()>;

    /// Forget the stored session; succeeds when nothing is stored
    async fn clear(&self) -> Result<()>;
}

// =============================================================================
// File store
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    version: u32,
    checksum: String,
    session: StoredSession,
}

fn checksum(session: &StoredSession) -> Result<String> {
    let payload = serde_json::to_string(session)?;
    Ok(format!("{:x}", md5::compute(payload)))
}

/// File store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the session file
    pub path: PathBuf,
    /// Current schema version
    pub version: u32,
    /// Write through a temp file and rename
    pub atomic_writes: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("session.json"),
            version: 1,
            atomic_writes: true,
        }
    }
}

impl StoreConfig {
    /// Create a configuration for a file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }

    /// Set schema version
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Enable or disable atomic writes
    pub fn atomic_writes(mut self, enabled: bool) -> Self {
        self.atomic_writes = enabled;
        self
    }
}

/// Session store backed by a JSON file
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    config: StoreConfig,
}

impl FileSessionStore {
    /// Create a store
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }

    /// Create a store at `path` with default settings
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self::new(StoreConfig::new(path))
    }

    /// Path of the session file
    pub fn path(&self) -> &std::path::Path {
        &self.config.path
    }

    async fn write_atomic(&self, contents: &str) -> Result<()> {
        let temp_path = self.config.path.with_extension("tmp");

        let written: std::io::Result<()> = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(contents.as_bytes()).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, &self.config.path).await
        }
        .await;

        if let Err(err) = written {
            if let Err(cleanup) = fs::remove_file(&temp_path).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %temp_path.display(), error = %cleanup, "failed to remove temp file");
                }
            }
            return Err(err.into());
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<StoredSession>> {
        let contents = match fs::read_to_string(&self.config.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let envelope: Envelope = serde_json::from_str(&contents)?;

        if envelope.version != self.config.version {
            return Err(StoreError::VersionMismatch {
                expected: self.config.version,
                found: envelope.version,
            });
        }

        let computed = checksum(&envelope.session)?;
        if computed != envelope.checksum {
            return Err(StoreError::Corruption(format!(
                "Checksum mismatch: expected {}, got {}",
                envelope.checksum, computed
            )));
        }

        Ok(Some(envelope.session))
    }

    async fn save(&self, session: &StoredSession) -> Result<()> {
        let envelope = Envelope {
            version: self.config.version,
            checksum: checksum(session)?,
            session: session.clone(),
        };
        let json = serde_json::to_string_pretty(&envelope)?;

        if self.config.atomic_writes {
            self.write_atomic(&json).await?;
        } else {
            fs::write(&self.config.path, json).await?;
        }

        tracing::debug!(path = %self.config.path.display(), "session saved");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.config.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Memory store
// =============================================================================

/// Session store that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: RwLock<Option<StoredSession>>,
}

impl MemorySessionStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds a session
    pub fn with_session(session: StoredSession) -> Self {
        Self { session: RwLock::new(Some(session)) }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<StoredSession>> {
        Ok(self.session.read().await.clone())
    }

    async fn save(&self, session: &StoredSession) -> Result<()> {
        *self.session.write().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        *self.session.write().await = None;
        Ok(())
    }
}
