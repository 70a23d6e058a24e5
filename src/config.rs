use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use dirs::{data_dir, home_dir};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::debounce::DEFAULT_WINDOW;

static CONFIG: Lazy<RwLock<SessionConfig>> =
    Lazy::new(|| RwLock::new(SessionConfig::load_or_default()));

const CONFIG_DIR: &str = ".session-state";
const CONFIG_FILE: &str = "session.yaml";
const STORE_DIR: &str = "session-state";

pub const DEFAULT_DEBOUNCE_MS: u64 = DEFAULT_WINDOW.as_millis() as u64;
const MAX_DEBOUNCE_MS: u64 = 10_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    #[serde(default)]
    pub store: StorePreferences,
    #[serde(default)]
    pub persistence: PersistencePreferences,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorePreferences {
    /// Overrides the platform data directory.
    #[serde(default)]
    pub directory: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistencePreferences {
    pub debounce_ms: u64,
}

impl Default for PersistencePreferences {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl SessionConfig {
    fn load_or_default() -> Self {
        let path = config_file_path();
        match Self::load_from(&path) {
            Ok(Some(config)) => config,
            Ok(None) => Self::default(),
            Err(error) => {
                log::warn!("Failed to load session config: {error:#}");
                Self::default()
            }
        }
    }

    /// Read and normalize a config file; `None` when it does not exist.
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(error) => {
                return Err(error).with_context(|| format!("failed to read {}", path.display()))
            }
        };
        let mut config: SessionConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        normalize_config(&mut config);
        Ok(Some(config))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let serialized = serde_yaml::to_string(self)?;
        fs::write(path, serialized).with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }

    fn persist(&self) {
        if let Err(error) = self.save_to(&config_file_path()) {
            log::warn!("Unable to write session config: {error:#}");
        }
    }

    pub fn store_dir(&self) -> PathBuf {
        match self.store.directory.as_deref() {
            Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => default_store_dir(),
        }
    }

    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.persistence.debounce_ms)
    }
}

fn normalize_config(config: &mut SessionConfig) {
    if config.persistence.debounce_ms > MAX_DEBOUNCE_MS {
        config.persistence.debounce_ms = DEFAULT_DEBOUNCE_MS;
    }
}

pub fn config_dir() -> Option<PathBuf> {
    home_dir().map(|home| home.join(CONFIG_DIR))
}

pub fn config_file_path() -> PathBuf {
    config_dir()
        .unwrap_or_else(|| PathBuf::from(CONFIG_DIR))
        .join(CONFIG_FILE)
}

pub fn default_store_dir() -> PathBuf {
    data_dir()
        .map(|dir| dir.join(STORE_DIR))
        .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join("store"))
}

pub fn read_config() -> SessionConfig {
    CONFIG.read().clone()
}

pub fn mutate_config<F>(mutator: F)
where
    F: FnOnce(&mut SessionConfig),
{
    let mut guard = CONFIG.write();
    mutator(&mut guard);
    normalize_config(&mut guard);
    guard.persist();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempdir().unwrap();
        assert!(SessionConfig::load_from(&dir.path().join("session.yaml"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_load_partial_file_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.yaml");
        fs::write(&path, "store:\n  directory: /var/lib/session\n").unwrap();

        let config = SessionConfig::load_from(&path).unwrap().unwrap();
        assert_eq!(config.store_dir(), PathBuf::from("/var/lib/session"));
        assert_eq!(config.debounce_window(), Duration::from_millis(200));
    }

    #[test]
    fn test_oversized_debounce_is_reset() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.yaml");
        fs::write(&path, "persistence:\n  debounceMs: 60000\n").unwrap();

        let config = SessionConfig::load_from(&path).unwrap().unwrap();
        assert_eq!(config.persistence.debounce_ms, DEFAULT_DEBOUNCE_MS);
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.yaml");
        fs::write(&path, "persistence:\n  debounceMs: soon\n").unwrap();

        assert!(SessionConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("session.yaml");
        let mut config = SessionConfig::default();
        config.persistence.debounce_ms = 500;
        config.save_to(&path).unwrap();

        assert_eq!(SessionConfig::load_from(&path).unwrap(), Some(config));
    }

    #[test]
    fn test_blank_directory_uses_default() {
        let mut config = SessionConfig::default();
        config.store.directory = Some("  ".into());
        assert_eq!(config.store_dir(), default_store_dir());
    }
}
