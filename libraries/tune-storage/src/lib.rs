//! Tune Storage
//!
//! Durable, namespaced JSON state for the Tune player.
//!
//! Two backends implement [`tune_core::StateStore`]:
//! - [`JsonFileStore`]: one file per namespace, atomic replace on write
//! - [`MemoryStore`]: process-local map, for tests and ephemeral sessions
//!
//! # Example
//!
//! ```rust,no_run
//! use tune_core::{load_state, save_state};
//! use tune_storage::JsonFileStore;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = JsonFileStore::open_default("tune")?;
//! save_state(&store, "tune-player-config", &serde_json::json!({"crossfade_ms": 2000}))?;
//! let config: Option<serde_json::Value> = load_state(&store, "tune-player-config")?;
//! # Ok(())
//! # }
//! ```

mod error;
mod file;
mod memory;

pub use error::{Result, StorageError};
pub use file::JsonFileStore;
pub use memory::MemoryStore;
