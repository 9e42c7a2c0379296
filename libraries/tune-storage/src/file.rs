//! File-backed state store
//!
//! Each namespace is a single `<namespace>.json` file inside the store's root
//! directory. Writes go to a temp file in the same directory and are renamed
//! into place, so a crash mid-write leaves the previous document intact. A
//! failed write removes its temp file.

use crate::error::{Result, StorageError};
use std::fs;
use std::io::{ErrorKind, Write};
use tempfile::NamedTempFile;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use tune_core::StateStore;

/// [`StateStore`] persisting one JSON file per namespace
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Open (creating if needed) a store rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        debug!(root = %root.display(), "Opened state store");
        Ok(Self { root })
    }

    /// Open a store in the platform data directory, e.g.
    /// `~/.local/share/<app_name>` on Linux
    pub fn open_default(app_name: &str) -> Result<Self> {
        let base = dirs::data_dir().ok_or(StorageError::NoDataDir)?;
        Self::open(base.join(app_name))
    }

    /// Directory holding the namespace files
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, namespace: &str) -> Result<PathBuf> {
        let valid = !namespace.is_empty()
            && !namespace.starts_with('.')
            && namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(StorageError::InvalidNamespace(namespace.to_string()));
        }
        Ok(self.root.join(format!("{namespace}.json")))
    }

    fn read(&self, namespace: &str) -> Result<Option<String>> {
        let path = self.path_for(namespace)?;
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = serde_json::from_str::<serde_json::Value>(&json) {
            warn!(namespace, error = %e, "Stored state is not valid JSON");
            return Err(StorageError::SerializationError(e.to_string()));
        }
        Ok(Some(json))
    }

    fn write(&self, namespace: &str, json: &str) -> Result<()> {
        let path = self.path_for(namespace)?;
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        debug!(namespace, bytes = json.len(), "Persisted state");
        Ok(())
    }

    fn delete(&self, namespace: &str) -> Result<()> {
        let path = self.path_for(namespace)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

impl StateStore for JsonFileStore {
    fn load_raw(&self, namespace: &str) -> tune_core::Result<Option<String>> {
        Ok(self.read(namespace)?)
    }

    fn save_raw(&self, namespace: &str, json: &str) -> tune_core::Result<()> {
        Ok(self.write(namespace, json)?)
    }

    fn remove(&self, namespace: &str) -> tune_core::Result<()> {
        Ok(self.delete(namespace)?)
    }
}
