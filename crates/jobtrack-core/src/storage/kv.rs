//! Synchronous key-value stores used by the flat backend

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tempfile::NamedTempFile;

/// A simple string-to-string store with whole-value reads and writes
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` if the key is absent
    ///
    /// # Errors
    /// Returns an error if the underlying store cannot be read
    fn get(&self, key: &str) -> io::Result<Option<String>>;

    /// Replace the value of a key in one step
    ///
    /// # Errors
    /// Returns an error if the value cannot be written
    fn set(&self, key: &str, value: &str) -> io::Result<()>;

    /// Remove a key; absent keys are ignored
    ///
    /// # Errors
    /// Returns an error if the key cannot be removed
    fn remove(&self, key: &str) -> io::Result<()>;

    /// All keys currently stored
    ///
    /// # Errors
    /// Returns an error if the store cannot be listed
    fn keys(&self) -> io::Result<Vec<String>>;

    /// Total bytes held (keys plus values)
    ///
    /// # Errors
    /// Returns an error if the store cannot be listed
    fn used_bytes(&self) -> io::Result<u64> {
        let mut total = 0u64;
        for key in self.keys()? {
            let len = self.get(&key)?.map_or(0, |v| v.len());
            total += (key.len() + len) as u64;
        }
        Ok(total)
    }
}

/// Directory-backed store: one file per key
///
/// File names are the hex encoding of the key, so any key is a safe name.
/// Writes go to a temporary file in the same directory and are renamed
/// over the old value, making each `set` atomic.
pub struct FileKeyValueStore {
    root: PathBuf,
}

impl FileKeyValueStore {
    const EXTENSION: &'static str = "json";

    /// Open (creating if needed) a store rooted at `root`
    ///
    /// # Errors
    /// Returns an error if the directory cannot be created
    pub fn open(root: &Path) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Directory holding the values
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", hex::encode(key), Self::EXTENSION))
    }

    fn key_for(path: &Path) -> Option<String> {
        if path.extension()? != Self::EXTENSION {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let bytes = hex::decode(stem).ok()?;
        String::from_utf8(bytes).ok()
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut file = NamedTempFile::new_in(&self.root)?;
        file.write_all(value.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(self.path_for(key)).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn keys(&self) -> io::Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if let Some(key) = Self::key_for(&path) {
                keys.push(key);
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn used_bytes(&self) -> io::Result<u64> {
        let mut total = 0u64;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if let Some(key) = Self::key_for(&entry.path()) {
                total += key.len() as u64 + entry.metadata()?.len();
            }
        }
        Ok(total)
    }
}

/// In-memory store (for testing)
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> io::Result<Vec<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.keys().cloned().collect())
    }
}
