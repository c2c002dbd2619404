//! Key-value persistence for the graph configuration.
//!
//! The configuration lives as one serialized record under [`CONFIG_KEY`].
//! Loading merges the record with defaults; saving rewrites the whole record.
//! A record that no longer parses is logged and replaced by defaults instead
//! of failing the caller.

use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::GraphConfig;
use crate::error::StoreError;

/// Storage key of the serialized [`GraphConfig`].
pub const CONFIG_KEY: &str = "haxeDepsCfg";

/// Environment variable overriding the store file location.
pub const STORE_ENV: &str = "MODGRAPH_STORE";

/// Minimal string key-value storage.
pub trait ConfigStore {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Drop the value under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// In-memory store, used by tests and embedders without persistence.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Store backed by a JSON object file (`{"key": "value", ...}`).
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// Use the store file at `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$MODGRAPH_STORE`, else `<config dir>/modgraph/store.json`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoConfigDir`] when neither is available.
    pub fn default_location() -> Result<Self, StoreError> {
        if let Some(path) = env::var_os(STORE_ENV) {
            return Ok(Self::new(path));
        }
        let dir = dirs::config_dir().ok_or(StoreError::NoConfigDir)?;
        Ok(Self::new(dir.join("modgraph").join("store.json")))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(BTreeMap::new());
            }
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, content).map_err(io_err)
    }
}

impl ConfigStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.read_all()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.read_all()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// Load the persisted config, backfilling defaults and validating it.
///
/// # Errors
///
/// Returns an error only if the store itself cannot be read. An unparsable
/// record falls back to [`GraphConfig::default`].
pub fn load_config(store: &dyn ConfigStore) -> Result<GraphConfig, StoreError> {
    let mut config = match store.get(CONFIG_KEY)? {
        Some(raw) => serde_json::from_str::<GraphConfig>(&raw).unwrap_or_else(|err| {
            warn!(error = %err, "stored config record is unreadable, using defaults");
            GraphConfig::default()
        }),
        None => GraphConfig::default(),
    };

    let report = config.validate();
    for field in &report.adjusted {
        warn!(field, "config value out of range, adjusted");
    }
    for pattern in &report.invalid_patterns {
        warn!(pattern = pattern.as_str(), "invalid regex rule is inert");
    }
    debug!(clean = report.is_clean(), "config loaded");
    Ok(config)
}

/// Serialize the full record and store it under [`CONFIG_KEY`].
///
/// # Errors
///
/// Returns an error if serialization or the store write fails.
pub fn save_config(store: &mut dyn ConfigStore, config: &GraphConfig) -> Result<(), StoreError> {
    let raw = serde_json::to_string(config)?;
    store.set(CONFIG_KEY, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayoutInit, RegexRule};

    #[test]
    fn missing_record_loads_defaults() {
        let store = MemoryStore::new();
        let cfg = load_config(&store).expect("load");
        assert_eq!(cfg, GraphConfig::default());
    }

    #[test]
    fn save_then_load_preserves_edits() {
        let mut store = MemoryStore::new();
        let cfg = GraphConfig {
            layout_init: LayoutInit::Circle,
            hide_min_deps: 0,
            hide_custom: vec![RegexRule::new(".+/test/.+")],
            ..GraphConfig::default()
        };
        save_config(&mut store, &cfg).expect("save");
        assert_eq!(load_config(&store).expect("load"), cfg);
    }

    #[test]
    fn garbage_record_falls_back_to_defaults() {
        let mut store = MemoryStore::new();
        store.set(CONFIG_KEY, "not json").expect("set");
        assert_eq!(load_config(&store).expect("load"), GraphConfig::default());
    }

    #[test]
    fn load_applies_validation() {
        let mut store = MemoryStore::new();
        store
            .set(CONFIG_KEY, r#"{"hideMinDependants":-40}"#)
            .expect("set");
        assert_eq!(load_config(&store).expect("load").hide_min_dependants, -1);
    }

    #[test]
    fn file_store_round_trips_and_creates_parents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/store.json");
        let mut store = FileStore::new(&path);
        assert_eq!(store.get("k").expect("get"), None);

        store.set("k", "v").expect("set");
        store.set("other", "w").expect("set");
        assert_eq!(store.get("k").expect("get").as_deref(), Some("v"));

        store.remove("k").expect("remove");
        assert_eq!(store.get("k").expect("get"), None);
        assert_eq!(
            FileStore::new(&path).get("other").expect("get").as_deref(),
            Some("w")
        );
    }

    #[test]
    fn corrupt_store_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("store.json");
        std::fs::write(&path, "[1, 2").expect("write");
        let store = FileStore::new(&path);
        assert!(matches!(store.get(CONFIG_KEY), Err(StoreError::Corrupt { .. })));
    }
}
