//! 提供者配置
//!
//! 从 TOML 文件加载，缺省项使用默认值；文件不存在时整体使用默认配置。

use crate::data::{DataError, Result};
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_APPLICATION_ID: &str = "org.mars3142.android.toaster";

/// 覆盖数据库路径的环境变量
pub const DB_PATH_ENV: &str = "TOASTER_DB_PATH";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// 应用 ID，用于推导授权名和刷新动作名
    pub application_id: String,
    /// 地址授权名
    pub authority: String,
    /// SQLite 数据库文件
    pub database_path: PathBuf,
    /// 显示刷新动作名（缺省为 `<application_id>.APPWIDGET_UPDATE`）
    pub widget_action: Option<String>,
    pub logging: LoggingConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            application_id: DEFAULT_APPLICATION_ID.to_string(),
            authority: format!("{DEFAULT_APPLICATION_ID}.provider"),
            database_path: data_dir().join("toaster.db"),
            widget_action: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl ProviderConfig {
    /// 从 TOML 文件加载配置，并应用环境变量覆盖
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
            toml::from_str::<ProviderConfig>(&content)?
        } else {
            tracing::debug!(path = ?path, "配置文件不存在，使用默认配置");
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// 从默认位置加载配置
    pub fn load_default() -> Result<Self> {
        Self::load(&default_config_path())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var(DB_PATH_ENV) {
            if !path.trim().is_empty() {
                self.database_path = PathBuf::from(path);
            }
        }
    }

    /// 显示刷新动作名
    pub fn widget_action(&self) -> String {
        self.widget_action
            .clone()
            .unwrap_or_else(|| format!("{}.APPWIDGET_UPDATE", self.application_id))
    }
}

/// 数据目录（不创建）
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("Toaster")
}

/// 默认配置文件路径
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("Toaster")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ProviderConfig::load(&temp_dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.authority, "org.mars3142.android.toaster.provider");
        assert_eq!(
            config.widget_action(),
            "org.mars3142.android.toaster.APPWIDGET_UPDATE"
        );
    }

    #[test]
    #[serial]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
application_id = "org.example.toaster"
authority = "org.example.toaster.provider"
database_path = "/var/lib/toaster/log.db"

[logging]
level = "debug"
"#,
        )
        .unwrap();

        let config = ProviderConfig::load(&path).unwrap();
        assert_eq!(config.authority, "org.example.toaster.provider");
        assert_eq!(config.widget_action(), "org.example.toaster.APPWIDGET_UPDATE");
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert!(config.logging.console_enabled);
    }

    #[test]
    #[serial]
    fn test_invalid_toml_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "authority = [").unwrap();

        let err = ProviderConfig::load(&path).unwrap_err();
        assert!(matches!(err, DataError::TomlDeserialization(_)));
    }

    #[test]
    #[serial]
    fn test_env_overrides_database_path() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("override.db");
        std::env::set_var(DB_PATH_ENV, &db_path);

        let config = ProviderConfig::load(&temp_dir.path().join("absent.toml")).unwrap();
        std::env::remove_var(DB_PATH_ENV);

        assert_eq!(config.database_path, db_path);
    }
}
