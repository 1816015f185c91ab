use std::path::PathBuf;

use crate::error::Result;
use crate::models::{Account, Session};

/// Single persisted slot naming the signed-in account. Last writer wins.
pub struct SessionHolder {
    path: PathBuf,
}

impl SessionHolder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn start(&self, account: &Account) -> Result<Session> {
        let session = Session::from(account);
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(&session)?;
        std::fs::write(&self.path, content)?;
        tracing::debug!(account = %session.account_id, "session started");
        Ok(session)
    }

    /// Missing or unreadable slots both read as "nobody signed in".
    pub fn current(&self) -> Option<Session> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!("Failed to read session {:?}: {}", self.path, e);
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(session) => Some(session),
            Err(e) => {
                tracing::warn!("Ignoring corrupt session {:?}: {}", self.path, e);
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    pub fn end(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!("session ended");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
