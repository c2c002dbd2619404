use std::path::PathBuf;

/// Errors from reading or writing the key-value config store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store file exists but could not be read or written.
    #[error("config store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store file is not a JSON object of strings.
    #[error("config store at {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A value could not be serialized for storage.
    #[error("failed to serialize config record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// No per-user config directory is available on this platform.
    #[error("no config directory available; set MODGRAPH_STORE")]
    NoConfigDir,
}
