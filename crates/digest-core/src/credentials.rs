//! Session credential storage.
//!
//! Stores the access/refresh pair and the logged-in user in
//! `<base>/credentials.json` with restricted permissions (0600).
//! Tokens are never logged or displayed in full.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::paths;
use crate::models::User;

/// Tokens and user info for the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// The access token (short-lived)
    pub access: String,
    /// The refresh token (long-lived)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<String>,
    /// User returned by the login endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// Shared credential holder, optionally backed by a file.
///
/// Every mutation is written through to disk before it becomes visible.
#[derive(Debug)]
pub struct CredentialStore {
    path: Option<PathBuf>,
    state: RwLock<Option<Credentials>>,
}

impl CredentialStore {
    /// Opens the default credentials file.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open_default() -> Result<Self> {
        Self::open(paths::credentials_path())
    }

    /// Opens a credentials file, starting logged out if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read credentials from {}", path.display()))?;
            Some(
                serde_json::from_str(&contents).with_context(|| {
                    format!("Failed to parse credentials from {}", path.display())
                })?,
            )
        } else {
            None
        };

        Ok(Self {
            path: Some(path),
            state: RwLock::new(state),
        })
    }

    /// Store that never touches the filesystem.
    pub fn in_memory(initial: Option<Credentials>) -> Self {
        Self {
            path: None,
            state: RwLock::new(initial),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn current(&self) -> Option<Credentials> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|c| c.access.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|c| c.refresh.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .and_then(|c| c.user.clone())
    }

    pub fn is_logged_in(&self) -> bool {
        self.access_token().is_some()
    }

    /// Replaces the whole session (login).
    ///
    /// # Errors
    /// Returns an error if the credentials file cannot be written.
    pub fn set(&self, creds: Credentials) -> Result<()> {
        self.persist(Some(&creds))?;
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = Some(creds);
        Ok(())
    }

    /// Stores a refreshed access token. The refresh token is only replaced
    /// when the service rotated it.
    ///
    /// # Errors
    /// Returns an error if the credentials file cannot be written.
    pub fn update_tokens(&self, access: String, refresh: Option<String>) -> Result<()> {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = guard.clone().unwrap_or(Credentials {
            access: String::new(),
            refresh: None,
            user: None,
        });
        next.access = access;
        if let Some(refresh) = refresh {
            next.refresh = Some(refresh);
        }
        self.persist(Some(&next))?;
        *guard = Some(next);
        Ok(())
    }

    /// Drops the session. Returns whether one existed.
    ///
    /// # Errors
    /// Returns an error if the credentials file cannot be removed.
    pub fn clear(&self) -> Result<bool> {
        let had = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        self.persist(None)?;
        Ok(had)
    }

    fn persist(&self, creds: Option<&Credentials>) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let Some(creds) = creds else {
            if path.exists() {
                fs::remove_file(path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
            }
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(creds).context("Failed to serialize credentials")?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(path)
                .with_context(|| format!("Failed to open {} for writing", path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(path, contents)
                .with_context(|| format!("Failed to write to {}", path.display()))?;
        }

        Ok(())
    }
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.len() <= 16 || !token.is_char_boundary(12) {
        return "***".to_string();
    }
    format!("{}...", &token[..12])
}
