//! Client-side visitor identity.
//!
//! A visitor token is minted once per client and kept in whatever durable
//! storage that client has. The token is handed to the tracker explicitly;
//! nothing here holds process-wide state.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity io error: {0}")]
    Io(#[from] io::Error),
    #[error("identity store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VisitorToken(String);

impl VisitorToken {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().hyphenated().to_string())
    }

    pub fn from_stored(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VisitorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait TokenStore {
    fn load(&self) -> Result<Option<String>, IdentityError>;
    fn save(&self, token: &str) -> Result<(), IdentityError>;
}

/// Keeps the token in a single file, creating parent directories on save.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<String>, IdentityError> {
        match fs::read_to_string(&self.path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, token: &str) -> Result<(), IdentityError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, format!("{token}\n"))?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    value: Mutex<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: &str) -> Self {
        Self {
            value: Mutex::new(Some(token.to_string())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<String>, IdentityError> {
        self.value
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| IdentityError::Unavailable("token lock poisoned".to_string()))
    }

    fn save(&self, token: &str) -> Result<(), IdentityError> {
        let mut guard = self
            .value
            .lock()
            .map_err(|_| IdentityError::Unavailable("token lock poisoned".to_string()))?;
        *guard = Some(token.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    /// Read back from the store.
    Persisted,
    /// Newly minted and saved.
    Generated,
    /// Newly minted but the store refused it; the next resolve mints again.
    Ephemeral,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitorIdentity {
    pub token: VisitorToken,
    pub source: TokenSource,
}

impl VisitorIdentity {
    pub fn resolve(store: &dyn TokenStore) -> Self {
        match store.load() {
            Ok(Some(value)) => {
                if let Some(token) = VisitorToken::from_stored(&value) {
                    return Self {
                        token,
                        source: TokenSource::Persisted,
                    };
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(event = "visitor_token_load_failed", error = %err);
            }
        }

        let token = VisitorToken::generate();
        match store.save(token.as_str()) {
            Ok(()) => Self {
                token,
                source: TokenSource::Generated,
            },
            Err(err) => {
                warn!(event = "visitor_token_save_failed", error = %err);
                Self {
                    token,
                    source: TokenSource::Ephemeral,
                }
            }
        }
    }
}
