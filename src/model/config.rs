use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::i18n::Language;
use crate::remote::shell::ShellTiming;

const DEFAULTS: &str = include_str!("../../config/default.toml");

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub connection: ConnectionConfig,
    pub device: DeviceConfig,
    pub form: FormDefaults,
    pub timing: TimingConfig,
    pub ui: UiConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub username: String,
    pub port: u16,
    pub timeout_secs: u64,
}

/// Fixed locations on the device.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    pub service: String,
    pub machine_json: String,
    pub power_json: String,
    pub mask_dir: String,
    pub mask_file: String,
    pub mask_backup: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FormDefaults {
    pub pixel_size_x: f64,
    pub pixel_size_y: f64,
    pub power_value: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimingConfig {
    pub service_settle_ms: u64,
    pub shell_ready_ms: u64,
    pub shell_step_ms: u64,
    pub shell_poll_ms: u64,
    pub shell_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
    pub language: String,
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config.
    pub fn load() -> Result<Self> {
        let user_path = directories::ProjectDirs::from("", "", "dent-remote")
            .map(|d| d.config_dir().join("config.toml"));
        Self::load_from(user_path.as_deref())
    }

    /// Load the embedded defaults, deep-merging `user_path` over them when it exists.
    pub fn load_from(user_path: Option<&Path>) -> Result<Self> {
        let mut table: toml::Table = toml::from_str(DEFAULTS)?;

        if let Some(path) = user_path.filter(|p| p.exists()) {
            let user_str = fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let user_table: toml::Table = toml::from_str(&user_str)
                .with_context(|| format!("parsing {}", path.display()))?;
            merge_tables(&mut table, user_table);
            tracing::info!("loaded user config from {}", path.display());
        }

        let config: AppConfig = toml::Value::Table(table).try_into()?;
        Ok(config)
    }

    /// The embedded defaults alone.
    pub fn defaults() -> Result<Self> {
        Self::load_from(None)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connection.timeout_secs)
    }

    pub fn service_settle(&self) -> Duration {
        Duration::from_millis(self.timing.service_settle_ms)
    }

    pub fn shell_timing(&self) -> ShellTiming {
        ShellTiming {
            ready_delay: Duration::from_millis(self.timing.shell_ready_ms),
            step_delay: Duration::from_millis(self.timing.shell_step_ms),
            poll_interval: Duration::from_millis(self.timing.shell_poll_ms.max(1)),
            timeout: Duration::from_secs(self.timing.shell_timeout_secs),
        }
    }

    pub fn language(&self) -> Language {
        Language::from_code(&self.ui.language)
    }

    /// Directory the mask browser opens in when nothing is selected yet.
    pub fn browse_start_dir() -> PathBuf {
        std::env::current_dir()
            .ok()
            .or_else(|| directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("/"))
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        let toml::Value::Table(overlay_inner) = value else {
            base.insert(key, value);
            continue;
        };

        if let Some(toml::Value::Table(base_inner)) = base.get_mut(&key) {
            merge_tables(base_inner, overlay_inner);
            continue;
        }

        base.insert(key, toml::Value::Table(overlay_inner));
    }
}
