//! Configuration for the cache storage handler.
//!
//! [`StoreConfig`] can be built directly from a directory and a size bound,
//! or loaded from a TOML file:
//!
//! ```toml
//! path = "/var/lib/ttlcache"
//! max_size = 2147483648
//! reap_interval_secs = 30
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default maximum storage size (2 GiB).
pub const DEFAULT_MAX_SIZE: u64 = 2 * 1024 * 1024 * 1024;

/// Default period between reaper sweeps.
pub const DEFAULT_REAP_INTERVAL_SECS: u64 = 30;

/// Name of the single table holding every entry.
pub const TABLE_NAME: &str = "entries";

/// Database file created inside the storage directory.
pub const DB_FILE_NAME: &str = "data.redb";

/// Permission bits for a newly created storage directory.
pub const DIR_MODE: u32 = 0o774;

/// Permission bits for the database file.
pub const FILE_MODE: u32 = 0o664;

/// Storage handler configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Directory holding the database file. Created if absent.
    pub path: PathBuf,
    /// Upper bound on the database file size in bytes.
    #[serde(default = "default_max_size")]
    pub max_size: u64,
    /// Seconds between reaper sweeps.
    #[serde(default = "default_reap_interval_secs")]
    pub reap_interval_secs: u64,
    /// Engine page cache size in bytes. Uses redb's default when unset.
    #[serde(default)]
    pub cache_size: Option<usize>,
}

fn default_max_size() -> u64 {
    DEFAULT_MAX_SIZE
}

fn default_reap_interval_secs() -> u64 {
    DEFAULT_REAP_INTERVAL_SECS
}

impl StoreConfig {
    /// Configuration for a storage directory and size bound, defaults elsewhere.
    pub fn new(path: impl Into<PathBuf>, max_size: u64) -> Self {
        Self {
            path: path.into(),
            max_size,
            reap_interval_secs: DEFAULT_REAP_INTERVAL_SECS,
            cache_size: None,
        }
    }

    /// Sets the reaper period, rounded up to whole seconds.
    #[must_use]
    pub fn with_reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval_secs = interval.as_secs() + u64::from(interval.subsec_nanos() > 0);
        self
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or is
    /// missing the `path` field.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::io(format!("reading config {}", path.display()), e))?;

        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] listing every problem found.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push("path cannot be empty".to_string());
        }
        if self.max_size == 0 {
            errors.push("max_size must be greater than 0".to_string());
        }
        if self.reap_interval_secs == 0 {
            errors.push("reap_interval_secs must be greater than 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Config(errors.join("; ")))
        }
    }

    /// Period between reaper sweeps.
    #[must_use]
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs)
    }

    /// Full path of the database file.
    #[must_use]
    pub fn db_file(&self) -> PathBuf {
        self.path.join(DB_FILE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_new_uses_defaults() {
        let config = StoreConfig::new("/tmp/cache", 1024);
        assert_eq!(config.max_size, 1024);
        assert_eq!(config.reap_interval(), Duration::from_secs(30));
        assert!(config.cache_size.is_none());
        assert_eq!(config.db_file(), PathBuf::from("/tmp/cache/data.redb"));
    }

    #[test]
    fn test_load_minimal_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "path = \"/tmp/ttlcache\"").unwrap();

        let config = StoreConfig::load_from(file.path()).unwrap();
        assert_eq!(config.path, PathBuf::from("/tmp/ttlcache"));
        assert_eq!(config.max_size, DEFAULT_MAX_SIZE);
        assert_eq!(config.reap_interval_secs, DEFAULT_REAP_INTERVAL_SECS);
        config.validate().unwrap();
    }

    #[test]
    fn test_load_full_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "path = \"/data\"\nmax_size = 4096\nreap_interval_secs = 5\ncache_size = 1048576"
        )
        .unwrap();

        let config = StoreConfig::load_from(file.path()).unwrap();
        assert_eq!(config.max_size, 4096);
        assert_eq!(config.reap_interval(), Duration::from_secs(5));
        assert_eq!(config.cache_size, Some(1_048_576));
    }

    #[test]
    fn test_load_missing_path_fails() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "max_size = 10").unwrap();

        let err = StoreConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let err = StoreConfig::load_from("/nonexistent/ttlcache.toml").unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_reap_interval_rounds_up_to_seconds() {
        let config =
            StoreConfig::new("/tmp/cache", 1024).with_reap_interval(Duration::from_millis(500));
        assert_eq!(config.reap_interval(), Duration::from_secs(1));
        config.validate().unwrap();

        let config = config.with_reap_interval(Duration::from_millis(2500));
        assert_eq!(config.reap_interval_secs, 3);

        let config = config.with_reap_interval(Duration::from_secs(7));
        assert_eq!(config.reap_interval_secs, 7);

        let config = config.with_reap_interval(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut config = StoreConfig::new("", 0);
        config.reap_interval_secs = 0;

        let msg = config.validate().unwrap_err().to_string();
        assert!(msg.contains("path cannot be empty"));
        assert!(msg.contains("max_size"));
        assert!(msg.contains("reap_interval_secs"));
    }
}
