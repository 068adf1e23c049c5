// Application state module
// Immutable per-process state derived from configuration at startup

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;

use super::types::Config;

/// Application state, read-only after startup
pub struct AppState {
    pub config: Config,
    base_dir: PathBuf,

    // Cached config value for fast access on the request path
    pub cached_access_log: AtomicBool,
}

impl AppState {
    /// Build state from loaded configuration.
    ///
    /// Canonicalizes the configured base directory once; startup fails when
    /// it does not exist or is not a directory.
    pub fn new(config: Config) -> io::Result<Self> {
        let base_dir = std::fs::canonicalize(&config.files.base_dir)?;
        if !base_dir.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("'{}' is not a directory", base_dir.display()),
            ));
        }

        let cached_access_log = AtomicBool::new(config.logging.access_log);
        Ok(Self {
            config,
            base_dir,
            cached_access_log,
        })
    }

    /// Canonical directory files are served from
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
