use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to parse json5 config: {0}")]
    Json5(#[from] json5::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub catalog_db_path: PathBuf,
    pub search_history_path: PathBuf,
    pub application_dirs: Vec<PathBuf>,
    pub system_application_dirs: Vec<PathBuf>,
    pub well_known_ids: Vec<String>,
    pub launch_command: Vec<String>,
    pub query_debounce_ms: u64,
    pub retention_days: u32,
    pub min_trusted_ratio: f64,
}

impl Default for Config {
    fn default() -> Self {
        let base = stable_app_data_dir();
        Self {
            catalog_db_path: base.join("catalog.sqlite3"),
            search_history_path: base.join("search_history.json"),
            application_dirs: default_application_dirs(),
            system_application_dirs: vec![PathBuf::from("/usr/share/applications")],
            well_known_ids: Vec::new(),
            launch_command: vec!["gtk-launch".to_string(), "{id}".to_string()],
            query_debounce_ms: 40,
            retention_days: 30,
            min_trusted_ratio: 0.5,
        }
    }
}

pub fn stable_app_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("appshelf")
}

fn default_application_dirs() -> Vec<PathBuf> {
    let mut roots = vec![
        PathBuf::from("/usr/share/applications"),
        PathBuf::from("/usr/local/share/applications"),
    ];
    if let Some(data) = dirs::data_dir() {
        roots.push(data.join("applications"));
    }
    roots
}

/// Reads a config file; `.json5`/`.json` parse as JSON5, everything else as TOML.
/// A missing file yields the defaults.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return Ok(Config::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("json5") || ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let config: Config = if is_json {
        json5::from_str(&raw)?
    } else {
        toml::from_str(&raw)?
    };
    validate(&config)?;
    Ok(config)
}

pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.catalog_db_path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("catalog_db_path is required".into()));
    }

    if cfg.search_history_path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid("search_history_path is required".into()));
    }

    if cfg.query_debounce_ms > 1_000 {
        return Err(ConfigError::Invalid("query_debounce_ms out of range".into()));
    }

    if cfg.retention_days == 0 {
        return Err(ConfigError::Invalid("retention_days must be at least 1".into()));
    }

    if !(0.0..=1.0).contains(&cfg.min_trusted_ratio) {
        return Err(ConfigError::Invalid("min_trusted_ratio must be within 0.0..=1.0".into()));
    }

    Ok(())
}
