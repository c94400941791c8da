use crate::error::AppError;
use crate::model::Priority;
use crate::remind::DEFAULT_LEAD_MINUTES;
use crate::storage::{platform_store_dir, store_dir_from_env};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::Duration;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TASKVOX_CONFIG_PATH";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
    /// Priority given to new tasks that do not name one.
    #[serde(default)]
    pub default_priority: Option<Priority>,
    #[serde(default)]
    pub reminder_lead_minutes: Option<u32>,
    #[serde(default)]
    pub log_filter: Option<String>,
}

impl Config {
    pub fn reminder_lead(&self) -> Duration {
        crate::remind::lead_from_minutes(self.reminder_lead_minutes.unwrap_or(DEFAULT_LEAD_MINUTES))
    }

    /// `TASKVOX_STORE_DIR`, then the configured directory, then the platform default.
    pub fn resolve_store_dir(&self) -> Result<PathBuf, AppError> {
        if let Some(path) = store_dir_from_env() {
            return Ok(path);
        }
        match self.store_dir.as_ref() {
            Some(path) => Ok(path.clone()),
            None => platform_store_dir(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub store_dir: Option<PathBuf>,
    pub default_priority: Option<Priority>,
    pub reminder_lead_minutes: Option<u32>,
    pub log_filter: Option<String>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("taskvox")
            .join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("taskvox")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::storage(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    normalize_config(config, path)
}

fn normalize_config(mut config: Config, path: &Path) -> Result<Config, AppError> {
    if let Some(priority) = config.default_priority.as_ref()
        && !priority.is_known()
    {
        return Err(AppError::invalid_data(format!(
            "default_priority '{}' in {} is not one of High, Medium or Low",
            priority,
            path.display()
        )));
    }
    config.log_filter = config
        .log_filter
        .map(|filter| filter.trim().to_string())
        .filter(|filter| !filter.is_empty());
    Ok(config)
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(store_dir) = overrides.store_dir.as_ref() {
        merged.store_dir = Some(store_dir.clone());
    }
    if let Some(priority) = overrides.default_priority.as_ref() {
        merged.default_priority = Some(priority.clone());
    }
    if let Some(minutes) = overrides.reminder_lead_minutes {
        merged.reminder_lead_minutes = Some(minutes);
    }
    if let Some(filter) = overrides.log_filter.as_ref() {
        merged.log_filter = Some(filter.clone());
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::{
        Config, ConfigOverrides, load_config_from_path, load_config_with_fallback_from_path,
        merge_overrides,
    };
    use crate::model::Priority;
    use std::fs;
    use std::path::PathBuf;
    use time::Duration;

    #[test]
    fn load_config_missing_returns_defaults_without_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config_with_fallback_from_path(&dir.path().join("missing.json"));

        assert_eq!(result.config, Config::default());
        assert!(result.error.is_none());
    }

    #[test]
    fn load_config_invalid_returns_defaults_and_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("invalid.json");
        fs::write(&path, "{ invalid json ").unwrap();

        let result = load_config_with_fallback_from_path(&path);

        assert_eq!(result.config, Config::default());
        assert_eq!(result.error.map(|err| err.code()), Some("invalid_data"));
    }

    #[test]
    fn load_config_reads_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let content = serde_json::json!({
            "store_dir": "/tmp/taskvox-data",
            "default_priority": "normal",
            "reminder_lead_minutes": 15,
            "log_filter": "  debug "
        });
        fs::write(&path, serde_json::to_string(&content).unwrap()).unwrap();

        let loaded = load_config_from_path(&path).unwrap();

        assert_eq!(loaded.store_dir, Some(PathBuf::from("/tmp/taskvox-data")));
        assert_eq!(loaded.default_priority, Some(Priority::Medium));
        assert_eq!(loaded.reminder_lead(), Duration::minutes(15));
        assert_eq!(loaded.log_filter.as_deref(), Some("debug"));
    }

    #[test]
    fn load_config_rejects_unknown_priority() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"default_priority":"urgent"}"#).unwrap();

        let err = load_config_from_path(&path).unwrap_err();

        assert_eq!(err.code(), "invalid_data");
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::default();

        assert_eq!(config.default_priority, None);
        assert_eq!(config.reminder_lead(), Duration::hours(1));
    }

    #[test]
    fn merge_overrides_replaces_only_supplied_fields() {
        let base = Config {
            store_dir: Some(PathBuf::from("/data")),
            default_priority: Some(Priority::Low),
            reminder_lead_minutes: Some(30),
            log_filter: None,
        };
        let overrides = ConfigOverrides {
            default_priority: Some(Priority::High),
            log_filter: Some("trace".into()),
            ..ConfigOverrides::default()
        };

        let merged = merge_overrides(&base, &overrides);

        assert_eq!(merged.store_dir, Some(PathBuf::from("/data")));
        assert_eq!(merged.default_priority, Some(Priority::High));
        assert_eq!(merged.reminder_lead_minutes, Some(30));
        assert_eq!(merged.log_filter.as_deref(), Some("trace"));
        assert_eq!(base.default_priority, Some(Priority::Low));
    }

    #[test]
    fn merge_overrides_with_empty_overrides_returns_clone() {
        let base = Config {
            store_dir: Some(PathBuf::from("/data")),
            ..Config::default()
        };

        let merged = merge_overrides(&base, &ConfigOverrides::default());

        assert_eq!(merged, base);
    }
}
