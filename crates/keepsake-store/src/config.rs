//! Store configuration.
//!
//! [`StoreConfig`] carries the database location, the default cache TTL
//! and the key under which the schema version is persisted. Defaults come
//! from the [`Default`] implementation; a TOML file can override any field
//! and `KEEPSAKE_*` environment variables override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

/// Environment variable overriding [`StoreConfig::db_path`].
pub const ENV_DB_PATH: &str = "KEEPSAKE_DB_PATH";
/// Environment variable overriding [`StoreConfig::cache_ttl_secs`].
pub const ENV_CACHE_TTL_SECS: &str = "KEEPSAKE_CACHE_TTL_SECS";
/// Environment variable overriding [`StoreConfig::schema_version_key`].
pub const ENV_SCHEMA_VERSION_KEY: &str = "KEEPSAKE_SCHEMA_VERSION_KEY";

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// SQLite database file.
    ///
    /// Default: **`data/keepsake.db`**.
    pub db_path: PathBuf,

    /// How long a cached read stays fresh, in seconds.
    ///
    /// Default: **300** (5 minutes).
    pub cache_ttl_secs: u64,

    /// Key holding the persisted schema version.
    ///
    /// Default: **`schema-version`**.
    pub schema_version_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("data/keepsake.db"),
            cache_ttl_secs: 300,
            schema_version_key: "schema-version".to_string(),
        }
    }
}

impl StoreConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document. Missing fields keep their defaults.
    pub fn from_toml_str(contents: &str) -> StoreResult<Self> {
        toml::from_str(contents).map_err(|e| StoreError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&contents)?;
        debug!(path = %path.display(), "store config loaded");
        Ok(config)
    }

    /// Apply `KEEPSAKE_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> StoreResult<Self> {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> StoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.db_path = PathBuf::from(path);
        }
        if let Some(ttl) = lookup(ENV_CACHE_TTL_SECS) {
            self.cache_ttl_secs = ttl.trim().parse().map_err(|_| {
                StoreError::Config(format!("{ENV_CACHE_TTL_SECS} must be a whole number, got `{ttl}`"))
            })?;
        }
        if let Some(key) = lookup(ENV_SCHEMA_VERSION_KEY) {
            if key.is_empty() {
                return Err(StoreError::Config(format!(
                    "{ENV_SCHEMA_VERSION_KEY} must not be empty"
                )));
            }
            self.schema_version_key = key;
        }
        Ok(self)
    }

    /// Set the database path.
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    /// Set the default cache TTL (in seconds).
    pub fn with_cache_ttl_secs(mut self, secs: u64) -> Self {
        self.cache_ttl_secs = secs;
        self
    }

    /// Set the schema version key.
    pub fn with_schema_version_key(mut self, key: impl Into<String>) -> Self {
        self.schema_version_key = key.into();
        self
    }

    /// The default cache TTL as a [`Duration`].
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = StoreConfig::default();
        assert_eq!(cfg.db_path, PathBuf::from("data/keepsake.db"));
        assert_eq!(cfg.cache_ttl_secs, 300);
        assert_eq!(cfg.default_ttl(), Duration::from_secs(300));
        assert_eq!(cfg.schema_version_key, "schema-version");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = StoreConfig::from_toml_str("cache_ttl_secs = 10\n").unwrap();
        assert_eq!(cfg.cache_ttl_secs, 10);
        assert_eq!(cfg.schema_version_key, "schema-version");
    }

    #[test]
    fn unknown_toml_field_is_rejected() {
        let err = StoreConfig::from_toml_str("cache_ttl = 10\n").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keepsake.toml");
        std::fs::write(&path, "db_path = \"/tmp/k.db\"\nschema_version_key = \"v\"\n").unwrap();

        let cfg = StoreConfig::load(&path).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("/tmp/k.db"));
        assert_eq!(cfg.schema_version_key, "v");
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = StoreConfig::load(dir.path().join("nope.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }

    #[test]
    fn overrides_win_over_file_values() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_DB_PATH, "/var/lib/keepsake.db"),
            (ENV_CACHE_TTL_SECS, " 42 "),
        ]);
        let cfg = StoreConfig::new()
            .with_cache_ttl_secs(5)
            .with_overrides_from(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(cfg.db_path, PathBuf::from("/var/lib/keepsake.db"));
        assert_eq!(cfg.cache_ttl_secs, 42);
        assert_eq!(cfg.schema_version_key, "schema-version");
    }

    #[test]
    fn bad_ttl_override_is_an_error() {
        let err = StoreConfig::new()
            .with_overrides_from(|name| (name == ENV_CACHE_TTL_SECS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_CACHE_TTL_SECS));
    }

    #[test]
    fn builder_methods() {
        let cfg = StoreConfig::new()
            .with_db_path("x.db")
            .with_schema_version_key("ver");
        assert_eq!(cfg.db_path, PathBuf::from("x.db"));
        assert_eq!(cfg.schema_version_key, "ver");
    }
}
