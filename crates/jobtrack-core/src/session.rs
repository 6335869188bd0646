//! Session state: who is currently logged in
//!
//! Kept outside the entity collections so it survives backend fallback.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::StorageResult;

/// Get/set holder for the current user id
pub trait SessionStore: Send + Sync {
    /// The logged-in user's id, if any
    ///
    /// # Errors
    /// Returns an error if the session cannot be read
    fn current_user_id(&self) -> StorageResult<Option<String>>;

    /// Log a user in (`Some`) or out (`None`)
    ///
    /// # Errors
    /// Returns an error if the session cannot be written
    fn set_current_user_id(&self, user_id: Option<&str>) -> StorageResult<()>;
}

/// Session persisted as a small file holding the user id
pub struct FileSession {
    path: PathBuf,
}

impl FileSession {
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl SessionStore for FileSession {
    fn current_user_id(&self) -> StorageResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let id = content.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_current_user_id(&self, user_id: Option<&str>) -> StorageResult<()> {
        match user_id {
            Some(id) => {
                if let Some(parent) = self.path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(&self.path, id)?;
            }
            None => match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }
}

/// Process-local session (for testing and embedding)
#[derive(Default)]
pub struct MemorySession {
    user_id: Mutex<Option<String>>,
}

impl MemorySession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A session with `user_id` already logged in
    #[must_use]
    pub fn logged_in(user_id: &str) -> Self {
        Self {
            user_id: Mutex::new(Some(user_id.to_string())),
        }
    }
}

impl SessionStore for MemorySession {
    fn current_user_id(&self) -> StorageResult<Option<String>> {
        Ok(self
            .user_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn set_current_user_id(&self, user_id: Option<&str>) -> StorageResult<()> {
        *self.user_id.lock().unwrap_or_else(PoisonError::into_inner) = user_id.map(str::to_string);
        Ok(())
    }
}
