//! Durable key/value state
//!
//! Player state (queue snapshot, player config) is persisted as JSON under a
//! namespace. Implementations live in `tune-storage`.

use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Namespaced JSON storage
///
/// Writes are whole-value replacements; a namespace holds exactly one document.
pub trait StateStore: Send + Sync {
    /// Raw JSON stored under `namespace`, if any
    fn load_raw(&self, namespace: &str) -> Result<Option<String>>;

    /// Replace the JSON stored under `namespace`
    fn save_raw(&self, namespace: &str, json: &str) -> Result<()>;

    /// Delete `namespace`; missing namespaces are not an error
    fn remove(&self, namespace: &str) -> Result<()>;
}

/// Load and deserialize a namespace
pub fn load_state<T: DeserializeOwned>(store: &dyn StateStore, namespace: &str) -> Result<Option<T>> {
    match store.load_raw(namespace)? {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

/// Serialize and store a namespace
pub fn save_state<T: Serialize>(store: &dyn StateStore, namespace: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)?;
    store.save_raw(namespace, &json)
}
