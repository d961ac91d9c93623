use std::path::PathBuf;

/// Directory used when `ROULETTE_DATA_DIR` is not set.
const DEFAULT_DATA_DIR: &str = "data/roulette";

/// Runtime configuration describing where the JSON documents live.
#[derive(Debug, Clone)]
pub struct FileStoreConfig {
    /// Directory holding one subdirectory per group.
    pub root: PathBuf,
}

impl FileStoreConfig {
    /// Construct a configuration rooted at an explicit directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Build a configuration by reading `ROULETTE_DATA_DIR`, falling back to [`DEFAULT_DATA_DIR`].
    pub fn from_env() -> Self {
        let root = std::env::var_os("ROULETTE_DATA_DIR")
            .map(PathBuf::from)
            .filter(|path| !path.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        Self::new(root)
    }
}
