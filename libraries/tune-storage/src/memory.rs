//! In-memory state store

use std::collections::HashMap;
use std::sync::Mutex;
use tune_core::{StateStore, TuneError};

/// Process-local [`StateStore`]. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored namespaces
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> TuneError {
    TuneError::storage("memory store lock poisoned")
}

impl StateStore for MemoryStore {
    fn load_raw(&self, namespace: &str) -> tune_core::Result<Option<String>> {
        let entries = self.entries.lock().map_err(|_| poisoned())?;
        Ok(entries.get(namespace).cloned())
    }

    fn save_raw(&self, namespace: &str, json: &str) -> tune_core::Result<()> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.insert(namespace.to_string(), json.to_string());
        Ok(())
    }

    fn remove(&self, namespace: &str) -> tune_core::Result<()> {
        let mut entries = self.entries.lock().map_err(|_| poisoned())?;
        entries.remove(namespace);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_remove() {
        let store = MemoryStore::new();
        assert!(store.is_empty());

        store.save_raw("ns", "{\"a\":1}").unwrap();
        assert_eq!(store.load_raw("ns").unwrap().as_deref(), Some("{\"a\":1}"));
        assert_eq!(store.len(), 1);

        store.remove("ns").unwrap();
        assert_eq!(store.load_raw("ns").unwrap(), None);
        // Removing twice is fine
        store.remove("ns").unwrap();
    }
}
