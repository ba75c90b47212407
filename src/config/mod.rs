use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::auth::MIN_SESSION_TTL_MINUTES;
use crate::tui::theme::ThemeConfig;

/// Environment variable that overrides the base directory (`~/.focusdeck/`).
pub const HOME_ENV: &str = "FOCUSDECK_HOME";

#[derive(Debug, Default, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub focus: FocusConfig,
    pub notifications: NotificationConfig,
    pub logging: LoggingConfig,
    pub theme: ThemeConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Database file. Relative paths resolve against the base directory.
    /// Default: focusdeck.db
    pub database: PathBuf,

    /// How long a sign-in stays valid before it must be refreshed.
    pub session_ttl_minutes: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig {
            database: PathBuf::from("focusdeck.db"),
            session_ttl_minutes: 60 * 24 * 7,
        }
    }
}

impl BackendConfig {
    /// Configured lifetime, raised to [`MIN_SESSION_TTL_MINUTES`] when shorter.
    pub fn session_ttl(&self) -> chrono::Duration {
        let minutes = i64::from(self.session_ttl_minutes).max(MIN_SESSION_TTL_MINUTES);
        chrono::Duration::minutes(minutes)
    }
}

/// Preset durations for the focus timer modes, in minutes.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct FocusConfig {
    pub focus_minutes: u32,
    pub short_break_minutes: u32,
    pub long_break_minutes: u32,
}

impl Default for FocusConfig {
    fn default() -> Self {
        FocusConfig {
            focus_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct NotificationConfig {
    /// Whether a desktop notification fires when a timer runs out. Default: true
    pub enabled: bool,

    /// Command to run for notifications. Default: "notify-send"
    pub command: String,

    /// Template for the notification message.
    /// {task} is replaced with the task title, {mode} with the timer mode.
    pub template: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        NotificationConfig {
            enabled: true,
            command: "notify-send".to_string(),
            template: "{mode} finished: {task}".to_string(),
        }
    }
}

impl NotificationConfig {
    pub fn render(&self, task_title: &str, mode: &str) -> String {
        self.template
            .replace("{task}", task_title)
            .replace("{mode}", mode)
    }

    /// Fire a notification without waiting for it.
    pub fn notify(&self, task_title: &str, mode: &str) {
        if !self.enabled {
            return;
        }

        let message = self.render(task_title, mode);
        let mut cmd = Command::new(&self.command);
        if self.command == "notify-send" {
            cmd.arg("focusdeck");
        }
        cmd.arg(&message);

        match cmd.spawn() {
            Ok(_) => tracing::debug!(command = %self.command, "notification sent"),
            Err(e) => tracing::warn!("notification command failed: {}", e),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive. `RUST_LOG` takes precedence.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
        }
    }
}

/// Returns the base focusdeck directory: `$FOCUSDECK_HOME` or ~/.focusdeck/
pub fn base_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().context("could not determine home directory")?;
    Ok(home.join(".focusdeck"))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(base_dir()?.join("config.toml"))
}

pub fn log_path() -> Result<PathBuf> {
    Ok(base_dir()?.join("focusdeck.log"))
}

impl Config {
    /// Database location, resolved against `base`.
    pub fn db_path(&self, base: &Path) -> PathBuf {
        if self.backend.database.is_absolute() {
            self.backend.database.clone()
        } else {
            base.join(&self.backend.database)
        }
    }
}

/// Ensure the base directory exists
pub fn ensure_dirs() -> Result<PathBuf> {
    let base = base_dir()?;
    fs::create_dir_all(&base)
        .with_context(|| format!("failed to create {}", base.display()))?;
    Ok(base)
}

/// Load config from the base directory (or return defaults if it doesn't exist)
pub fn load() -> Result<Config> {
    load_from(&config_path()?)
}

pub fn load_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))?;
    if i64::from(config.backend.session_ttl_minutes) < MIN_SESSION_TTL_MINUTES {
        tracing::warn!(
            configured = config.backend.session_ttl_minutes,
            "session_ttl_minutes too short, using {MIN_SESSION_TTL_MINUTES}"
        );
    }
    Ok(config)
}
